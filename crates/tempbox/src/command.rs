//! Command line parsing for the interactive loop.

use anyhow::{Context, Result, anyhow, bail};
use tempbox_core::{Preference, ProviderPreference, ProviderTag, Tab};

/// A command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a resource, replacing the active one.
    New(Preference),
    /// Archive the active resource and create a replacement.
    Renew,
    /// Delete the active resource.
    Delete,
    /// Extend the active resource.
    Extend,
    /// Poll messages now.
    Refresh,
    /// Print the current screen.
    Show,
    /// Open the n-th item of the current listing (1-based).
    Open(usize),
    /// Leave the detail view.
    Back,
    /// Switch tabs.
    Tab(Tab),
    /// Pin the active resource.
    Save,
    /// Pin the n-th message of the active resource (1-based).
    SaveMessage(usize),
    /// Toggle selection of the n-th collection entry (1-based).
    Select(usize),
    /// Select or deselect every entry of the current collection.
    SelectAll,
    /// Delete the selected entries of the current collection.
    DeleteSelected,
    /// Delete every entry of the current collection.
    Clear,
    /// List a provider's domains.
    Domains(ProviderPreference),
    /// Print the command list.
    Help,
    /// Exit.
    Quit,
}

/// Help text printed by `help`.
pub const HELP: &str = "\
commands:
  new [provider|auto] [domain]   create a new mailbox
  renew                          archive the mailbox and get a new one
  delete | extend                delete or extend the mailbox
  refresh                        check for new messages
  show                           print the current screen
  open <n>                       open item n of the current list
  back                           leave the open item
  tab <active|history|pinned>    switch tabs
  save | save-msg <n>            pin the mailbox or message n
  select <n> | select-all        toggle selection in history/pinned
  delete-selected | clear        delete selected or all entries
  domains [provider]             list domains
  quit";

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "new" => Self::New(preference(&args)),
            "renew" => Self::Renew,
            "delete" => Self::Delete,
            "extend" => Self::Extend,
            "refresh" => Self::Refresh,
            "show" | "ls" => Self::Show,
            "open" => Self::Open(index(&args)?),
            "back" => Self::Back,
            "tab" => {
                let name = args.first().context("usage: tab <active|history|pinned>")?;
                Self::Tab(Tab::parse(name).ok_or_else(|| anyhow!("unknown tab: {name}"))?)
            }
            "save" => Self::Save,
            "save-msg" => Self::SaveMessage(index(&args)?),
            "select" => Self::Select(index(&args)?),
            "select-all" => Self::SelectAll,
            "delete-selected" => Self::DeleteSelected,
            "clear" => Self::Clear,
            "domains" => Self::Domains(
                args.first()
                    .map_or(ProviderPreference::Auto, |p| ProviderPreference::from((*p).to_string())),
            ),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("unknown command: {other} (try `help`)"),
        };
        Ok(Some(command))
    }
}

fn preference(args: &[&str]) -> Preference {
    match args {
        [] => Preference::auto(),
        [provider, rest @ ..] => {
            let domain = rest.first().map(|d| (*d).to_string());
            if provider.eq_ignore_ascii_case("auto") {
                Preference {
                    provider: ProviderPreference::Auto,
                    domain,
                }
            } else {
                Preference::specific(ProviderTag::parse(provider), domain)
            }
        }
    }
}

/// Converts a 1-based argument into a 0-based index.
fn index(args: &[&str]) -> Result<usize> {
    let raw = args.first().context("missing item number")?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => bail!("not an item number: {raw}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_new_with_preferences() {
        assert_eq!(parse("new"), Command::New(Preference::auto()));
        assert_eq!(
            parse("new mailgw x.test"),
            Command::New(Preference::specific(
                ProviderTag::MailGw,
                Some("x.test".to_string())
            ))
        );
        assert_eq!(
            parse("new auto x.test"),
            Command::New(Preference {
                provider: ProviderPreference::Auto,
                domain: Some("x.test".to_string()),
            })
        );
    }

    #[test]
    fn test_item_numbers_are_one_based() {
        assert_eq!(parse("open 1"), Command::Open(0));
        assert_eq!(parse("save-msg 3"), Command::SaveMessage(2));
        assert!(Command::parse("open 0").is_err());
        assert!(Command::parse("select").is_err());
        assert!(Command::parse("select two").is_err());
    }

    #[test]
    fn test_tabs_and_misc() {
        assert_eq!(parse("tab saved"), Command::Tab(Tab::Pinned));
        assert_eq!(parse("  QUIT "), Command::Quit);
        assert_eq!(
            parse("domains 1secmail"),
            Command::Domains(ProviderPreference::Specific(ProviderTag::OneSecMail))
        );
        assert!(Command::parse("   ").unwrap().is_none());
        assert!(Command::parse("tab nowhere").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }
}
