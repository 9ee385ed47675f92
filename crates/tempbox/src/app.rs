//! Command execution against a workspace.

use anyhow::{Result, bail};
use tempbox_core::{
    DetailItem, Entry, MailGateway, MessageId, RemoteEntry, Renewal, ResourceId, SaveOutcome,
    Scope, SyncedCollection, Tab, View, Workspace,
};
use tracing::debug;

use crate::command::{Command, HELP};
use crate::render;

/// Interactive front end over a [`Workspace`].
pub struct App<G> {
    workspace: Workspace<G>,
}

/// Whether the loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl<G: MailGateway> App<G> {
    pub const fn new(workspace: Workspace<G>) -> Self {
        Self { workspace }
    }

    pub const fn workspace(&self) -> &Workspace<G> {
        &self.workspace
    }

    /// Runs one command and returns what to print.
    pub async fn execute(&self, command: Command) -> Result<(Flow, String)> {
        debug!("Executing {command:?}");
        let ws = &self.workspace;
        let session = ws.session();

        let notice = match command {
            Command::Quit => return Ok((Flow::Quit, String::new())),
            Command::Help => HELP.to_string(),
            Command::Show => render::screen(ws),
            Command::New(preference) => {
                let resource = session.create(preference).await?;
                ws.switch_tab(Tab::Active);
                format!("created {}", resource.address)
            }
            Command::Renew => match session.archive_and_replace().await? {
                Renewal::Replaced(resource) => format!("renewed as {}", resource.address),
                Renewal::AlreadyInFlight => "a renewal is already in progress".to_string(),
                Renewal::Superseded => "the mailbox changed while renewing".to_string(),
            },
            Command::Delete => {
                session.delete().await?;
                "mailbox deleted".to_string()
            }
            Command::Extend => {
                let resource = session.extend().await?;
                format!(
                    "extended until {}",
                    resource.expires_at.format("%H:%M:%S UTC")
                )
            }
            Command::Refresh => self.refresh().await?,
            Command::Open(index) => {
                self.open(index).await?;
                render::screen(ws)
            }
            Command::Back => {
                ws.back();
                render::screen(ws)
            }
            Command::Tab(tab) => {
                ws.switch_tab(tab);
                render::screen(ws)
            }
            Command::Save => saved(ws.save_active().await?),
            Command::SaveMessage(index) => {
                let (resource_id, message_id) = self.message_at(index)?;
                saved(ws.save_message(&resource_id, &message_id).await?)
            }
            Command::Select(index) => {
                match ws.view().tab() {
                    Tab::History => select_nth(ws.history(), index)?,
                    Tab::Pinned => select_nth(ws.pinned(), index)?,
                    Tab::Active => bail!("selection applies to the history and pinned tabs"),
                }
                render::screen(ws)
            }
            Command::SelectAll => {
                match ws.view().tab() {
                    Tab::History => ws.history().toggle_select_all(),
                    Tab::Pinned => ws.pinned().toggle_select_all(),
                    Tab::Active => bail!("selection applies to the history and pinned tabs"),
                }
                render::screen(ws)
            }
            Command::DeleteSelected => {
                let removed = match ws.view().tab() {
                    Tab::History => ws.history().delete_selected().await?,
                    Tab::Pinned => ws.pinned().delete_selected().await?,
                    Tab::Active => bail!("nothing to delete here; use `delete`"),
                };
                format!("deleted {removed} entries")
            }
            Command::Clear => {
                let removed = match ws.view().tab() {
                    Tab::History => ws.history().clear().await?,
                    Tab::Pinned => ws.pinned().clear().await?,
                    Tab::Active => bail!("nothing to clear here; use `delete`"),
                };
                format!("cleared {removed} entries")
            }
            Command::Domains(provider) => {
                let domains = session.domains(&provider).await?;
                if domains.is_empty() {
                    format!("{} offers no domains right now", provider.as_str())
                } else {
                    domains.join("\n")
                }
            }
        };
        Ok((Flow::Continue, notice))
    }

    async fn refresh(&self) -> Result<String> {
        let ws = &self.workspace;
        Ok(match ws.view().tab() {
            Tab::Active => {
                let outcome = ws.session().refresh().refresh_now().await?;
                debug!("Manual refresh: {outcome:?}");
                render::screen(ws)
            }
            Tab::History => format!("{} history entries", ws.history().sync().await?),
            Tab::Pinned => format!("{} pinned entries", ws.pinned().sync().await?),
        })
    }

    async fn open(&self, index: usize) -> Result<()> {
        let ws = &self.workspace;
        let view = ws.view();
        match view.view() {
            View::List(Tab::Active) => {
                let (_, message_id) = self.active_message(index)?;
                ws.open_message(Scope::Active, &message_id).await?;
            }
            View::List(Tab::History) => {
                let Some(entry) = ws.history().nth(index) else {
                    bail!("no history entry {}", index + 1);
                };
                ws.open_history(&entry.resource.id).await?;
            }
            View::List(Tab::Pinned) => {
                let Some(entry) = ws.pinned().nth(index) else {
                    bail!("no pinned entry {}", index + 1);
                };
                ws.open_pinned(&entry.id)?;
            }
            View::Detail(Scope::History(id), DetailItem::Resource) => {
                let Some(message) = view.listing().and_then(|m| m.get(index)) else {
                    bail!("no message {}", index + 1);
                };
                ws.open_message(Scope::History(id.clone()), &message.id)
                    .await?;
            }
            View::Detail(..) => bail!("nothing to open here; go `back` first"),
        }
        Ok(())
    }

    /// Resource and message shown at `index` in the current message list.
    fn message_at(&self, index: usize) -> Result<(ResourceId, MessageId)> {
        let ws = &self.workspace;
        let view = ws.view();
        match view.view() {
            View::List(Tab::Active) => self.active_message(index),
            View::Detail(Scope::History(id), DetailItem::Resource) => {
                let Some(message) = view.listing().and_then(|m| m.get(index)) else {
                    bail!("no message {}", index + 1);
                };
                Ok((id.clone(), message.id.clone()))
            }
            _ => bail!("open a message list first"),
        }
    }

    /// Message at `index` of the active mailbox's listing.
    ///
    /// Fails if the listing on screen belongs to a mailbox that has since
    /// been replaced.
    fn active_message(&self, index: usize) -> Result<(ResourceId, MessageId)> {
        let session = self.workspace.session();
        let Some(active) = session.active() else {
            bail!("no active mailbox");
        };
        if session.refresh().followed().as_ref() != Some(&active.id) {
            bail!("the message list is out of date; `refresh` first");
        }
        let Some(message) = session.refresh().message_of(&active.id, index) else {
            bail!("no message {}", index + 1);
        };
        Ok((active.id, message.id))
    }
}

fn select_nth<E: RemoteEntry, G>(collection: &SyncedCollection<E, G>, index: usize) -> Result<()> {
    let Some(entry) = collection.nth(index) else {
        bail!("no entry {}", index + 1);
    };
    collection.toggle_selected(entry.id());
    Ok(())
}

fn saved(outcome: SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saved(entry) => format!("pinned {}", entry.label()),
        SaveOutcome::AlreadySaved(entry) => format!("already pinned as {}", entry.label()),
    }
}
