//! Interactive shell
//!
//! Every command runs against the same cache, so pages only hit the
//! network when something changed. A failed `list` can be re-run with
//! `retry`.

use anyhow::Result;
use clap::Parser;

use super::{run_page, ui, App, Commands, ListArgs};
use crate::error::ApiError;

const PROMPT: &str = "crm>";

#[derive(Parser)]
#[command(no_binary_name = true, name = "crm")]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

enum Input {
    Quit,
    Retry,
    Help,
    Command(Commands),
    Nothing,
}

/// Run the shell until `exit` or Ctrl-D
pub async fn run_shell(app: &App) -> Result<()> {
    ui::status("Type a command, `help` for the list, `exit` to leave.");
    let mut failed_list: Option<ListArgs> = None;

    while let Some(line) = ui::prompt_line(PROMPT)? {
        let command = match parse_line(&line) {
            Input::Quit => break,
            Input::Nothing => continue,
            Input::Help => {
                print_help();
                continue;
            }
            Input::Retry => match failed_list.take() {
                Some(args) => {
                    app.cache.invalidate(args.entity);
                    Commands::List(args)
                }
                None => {
                    ui::status("Nothing to retry.");
                    continue;
                }
            },
            Input::Command(command) => command,
        };

        let retry_target = match &command {
            Commands::List(args) => Some(args.clone()),
            _ => None,
        };

        let result = run_page(app, command).await;
        if let Err(e) = &result {
            ui::error(&format!("{:#}", e));
            if retry_target.is_some() && is_transient(e) {
                ui::status("Type `retry` to fetch again.");
            }
        }
        failed_list = retry_after(result.is_ok(), retry_target);
    }

    tracing::debug!(stats = ?app.cache.stats(), "shell closed");
    Ok(())
}

fn is_transient(e: &anyhow::Error) -> bool {
    e.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_transient)
}

/// What `retry` re-runs after a command. Any success forgets the last
/// failed list.
fn retry_after(succeeded: bool, list: Option<ListArgs>) -> Option<ListArgs> {
    if succeeded {
        None
    } else {
        list
    }
}

fn parse_line(line: &str) -> Input {
    let words = match tokenize(line) {
        Ok(words) => words,
        Err(e) => {
            ui::error(&e);
            return Input::Nothing;
        }
    };

    match words.first().map(String::as_str) {
        None => Input::Nothing,
        Some("exit" | "quit") => Input::Quit,
        Some("retry") => Input::Retry,
        Some("help") if words.len() == 1 => Input::Help,
        Some(_) => match ShellLine::try_parse_from(&words) {
            Ok(parsed) => Input::Command(parsed.command),
            Err(e) => {
                let _ = e.print();
                Input::Nothing
            }
        },
    }
}

fn print_help() {
    let lines = [
        "list <type> [--related-type T --related-id ID]",
        "create <type> --set key=value... [--company Q] [--person Q]",
        "update <type> <id> --set key=value... [--company Q] [--person Q]",
        "delete <type> <id> [--yes]",
        "sync-mail <lead-id>",
        "threads <lead-id>",
        "whoami | logout",
        "retry | exit",
    ];
    for line in lines {
        ui::status(line);
    }
}

/// Split a line into words. Single or double quotes group words.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unclosed {} quote", q));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize(r#"create deal --set "title=Fleet renewal" --company 'Acme Corp'"#).unwrap(),
            vec!["create", "deal", "--set", "title=Fleet renewal", "--company", "Acme Corp"]
        );
        assert_eq!(tokenize("  list   people ").unwrap(), vec!["list", "people"]);
        assert_eq!(tokenize(r#"--set description="""#).unwrap(), vec!["--set", "description="]);
        assert!(tokenize(r#"create "oops"#).is_err());
    }

    #[test]
    fn test_success_forgets_failed_list() {
        let notes = ListArgs {
            entity: EntityType::Note,
            related_type: None,
            related_id: None,
        };
        let failed = retry_after(false, Some(notes.clone()));
        assert_eq!(failed.as_ref().map(|a| a.entity), Some(EntityType::Note));

        // A later successful command, list or not, clears it.
        assert!(retry_after(true, None).is_none());
        assert!(retry_after(true, Some(notes)).is_none());

        // A failed non-list command leaves nothing to retry either.
        assert!(retry_after(false, None).is_none());
    }

    #[test]
    fn test_transient_errors_offer_retry() {
        assert!(is_transient(&anyhow::Error::new(ApiError::network("connection refused"))));
        assert!(!is_transient(&anyhow::Error::new(ApiError::Unauthorized)));
        assert!(!is_transient(&anyhow::anyhow!("expected key=value")));
    }

    #[test]
    fn test_parse_line() {
        assert!(matches!(parse_line("exit"), Input::Quit));
        assert!(matches!(parse_line("   "), Input::Nothing));
        assert!(matches!(parse_line("retry"), Input::Retry));

        match parse_line("list notes --related-type company --related-id c1") {
            Input::Command(Commands::List(args)) => {
                assert_eq!(args.entity, EntityType::Note);
                assert_eq!(args.related_id.as_deref(), Some("c1"));
            }
            _ => panic!("expected a list command"),
        }

        match parse_line("delete company c1 --yes") {
            Input::Command(Commands::Delete(args)) => assert!(args.yes),
            _ => panic!("expected a delete command"),
        }
    }
}
