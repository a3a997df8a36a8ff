use crate::account::{Account, AccountStore};
use crate::error::PhantomError;
use log::{error, warn};
use std::fmt::Write;

pub const HELP_TEXT: &str = "\nAvailable commands:\n\
create - Create a new anonymous account\n\
delete <id> - Delete an account by ID\n\
list - List all active accounts\n\
help - Show this help message\n\
quit - Disconnect from server\n\n";

pub const UNKNOWN_COMMAND: &str = "\nUnknown command. Type 'help' for available commands.\n";
pub const CREATE_FAILED: &str = "\nFailed to create account\n";
pub const DELETE_FAILED: &str = "\nFailed to delete account or account not found\n";
pub const GOODBYE: &str = "\nGoodbye\n";

/// A client request, decided by case-sensitive prefix on the raw input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create,
    Delete(String),
    List,
    Help,
    Quit,
    Unknown,
}

impl Command {
    /// Parse one read worth of input.
    ///
    /// Only the prefix is checked, so `createfoo` is still `create`. For
    /// `delete` the id is whatever follows the prefix with leading spaces and
    /// trailing whitespace removed.
    pub fn parse(input: &str) -> Command {
        if input.starts_with("create") {
            Command::Create
        } else if let Some(rest) = input.strip_prefix("delete") {
            Command::Delete(rest.trim_start_matches(' ').trim_end().to_string())
        } else if input.starts_with("list") {
            Command::List
        } else if input.starts_with("help") {
            Command::Help
        } else if input.starts_with("quit") {
            Command::Quit
        } else {
            Command::Unknown
        }
    }
}

/// Text sent back to the client, plus whether to hang up afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub close: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Reply {
        Reply {
            text: text.into(),
            close: false,
        }
    }
}

/// Apply a command to the store and format the response.
pub fn execute(store: &AccountStore, command: &Command) -> Reply {
    match command {
        Command::Create => match store.create() {
            Ok(account) => Reply::text(format_created(&account)),
            Err(PhantomError::StoreFull { capacity }) => {
                warn!("Account store full ({capacity} accounts)");
                Reply::text(CREATE_FAILED)
            }
            Err(e) => {
                error!("Failed to create account: {e}");
                Reply::text(CREATE_FAILED)
            }
        },
        Command::Delete(id) => match store.delete(id) {
            Ok(true) => Reply::text(format!("\nAccount deleted: {id}\n")),
            Ok(false) => Reply::text(DELETE_FAILED),
            Err(e) => {
                error!("Failed to delete account: {e}");
                Reply::text(DELETE_FAILED)
            }
        },
        Command::List => match store.list() {
            Ok(accounts) => Reply::text(format_listing(&accounts)),
            Err(e) => {
                error!("Failed to list accounts: {e}");
                Reply::text(format_listing(&[]))
            }
        },
        Command::Help => Reply::text(HELP_TEXT),
        Command::Quit => Reply {
            text: GOODBYE.to_string(),
            close: true,
        },
        Command::Unknown => Reply::text(UNKNOWN_COMMAND),
    }
}

pub fn format_created(account: &Account) -> String {
    format!(
        "\nAccount created:\nID: {}\nCreation Time: {}\nExpiry Time: {}\n",
        account.get_id(),
        account.get_created_at(),
        account.get_expires_at()
    )
}

pub fn format_listing(accounts: &[Account]) -> String {
    let mut out = format!("\nActive accounts: {}\n", accounts.len());
    for account in accounts {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "ID: {}\nCreated: {}\nExpires: {}\n\n",
            account.get_id(),
            account.get_created_at(),
            account.get_expires_at()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SEED_LEN;

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(Command::parse("create"), Command::Create);
        assert_eq!(Command::parse("create\n"), Command::Create);
        assert_eq!(Command::parse("createfoo"), Command::Create);
        assert_eq!(Command::parse("list\r\n"), Command::List);
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("quit\n"), Command::Quit);
        assert_eq!(Command::parse("frobnicate"), Command::Unknown);
        assert_eq!(Command::parse(""), Command::Unknown);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Command::parse("CREATE"), Command::Unknown);
        assert_eq!(Command::parse("List"), Command::Unknown);
        assert_eq!(Command::parse(" create"), Command::Unknown);
    }

    #[test]
    fn test_parse_delete_id() {
        assert_eq!(
            Command::parse("delete    abc123\n"),
            Command::Delete("abc123".to_string())
        );
        assert_eq!(
            Command::parse("deleteabc"),
            Command::Delete("abc".to_string())
        );
        assert_eq!(Command::parse("delete"), Command::Delete(String::new()));
    }

    #[test]
    fn test_create_and_full() {
        let store = AccountStore::new(1);
        let reply = execute(&store, &Command::Create);
        assert!(reply.text.starts_with("\nAccount created:\nID: "));
        assert!(!reply.close);

        let reply = execute(&store, &Command::Create);
        assert_eq!(reply.text, CREATE_FAILED);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_roundtrip() {
        let store = AccountStore::new(2);
        let account = store.create().unwrap();
        let command = Command::Delete(account.get_id().to_string());

        let reply = execute(&store, &command);
        assert_eq!(reply.text, format!("\nAccount deleted: {}\n", account.get_id()));
        assert_eq!(execute(&store, &command).text, DELETE_FAILED);
    }

    #[test]
    fn test_delete_ghost() {
        let store = AccountStore::new(2);
        store.create().unwrap();
        let reply = execute(&store, &Command::Delete("ghost-id".to_string()));
        assert_eq!(reply.text, DELETE_FAILED);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_empty() {
        let store = AccountStore::new(2);
        assert_eq!(
            execute(&store, &Command::List).text,
            "\nActive accounts: 0\n"
        );
    }

    #[test]
    fn test_format_listing() {
        let accounts = vec![Account::from_seed([1u8; SEED_LEN], 100)];
        let text = format_listing(&accounts);
        assert_eq!(
            text,
            format!(
                "\nActive accounts: 1\nID: {}\nCreated: 100\nExpires: {}\n\n",
                accounts[0].get_id(),
                100 + 7_776_000
            )
        );
    }

    #[test]
    fn test_quit_closes() {
        let store = AccountStore::new(1);
        let reply = execute(&store, &Command::Quit);
        assert_eq!(reply.text, GOODBYE);
        assert!(reply.close);
    }

    #[test]
    fn test_help_lists_commands() {
        let store = AccountStore::new(1);
        let reply = execute(&store, &Command::Help);
        for name in ["create", "delete <id>", "list", "help", "quit"] {
            assert!(reply.text.contains(name));
        }
    }
}
