//! Plain-text rendering.

use std::fmt::Write as _;

use tempbox_core::{
    ClearReason, DetailItem, MailGateway, Message, MessageDetail, Resource, Scope, SessionEvent,
    Tab, View, Workspace, format_time_left,
};

/// One line describing the active resource.
pub fn resource_line(resource: &Resource, time_left: u64) -> String {
    let state = if resource.is_archived {
        "expired, renewing".to_string()
    } else {
        format!("{} left", format_time_left(time_left))
    };
    format!(
        "{} ({}) {state}",
        resource.address,
        resource.provider.display_name()
    )
}

/// Numbered message summaries.
pub fn message_list(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "  (no messages)\n".to_string();
    }
    let mut out = String::new();
    for (n, message) in messages.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {}  {}  {}",
            n + 1,
            message.created_at.format("%H:%M"),
            message.from.display(),
            if message.subject.is_empty() {
                "(no subject)"
            } else {
                message.subject.as_str()
            }
        );
    }
    out
}

/// Numbered collection entries with selection markers.
pub fn entry_list(entries: impl IntoIterator<Item = (String, bool)>) -> String {
    let mut out = String::new();
    for (n, (label, selected)) in entries.into_iter().enumerate() {
        let mark = if selected { 'x' } else { ' ' };
        let _ = writeln!(out, "  [{mark}] {:>2}. {label}", n + 1);
    }
    if out.is_empty() {
        out.push_str("  (empty)\n");
    }
    out
}

/// Full message. Plain text is preferred; HTML is shown raw otherwise.
pub fn message_detail(detail: &MessageDetail) -> String {
    let summary = &detail.summary;
    let mut out = format!(
        "From:    {}\nSubject: {}\nDate:    {}\n\n",
        summary.from.display(),
        summary.subject,
        summary.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    if detail.is_empty() {
        out.push_str("(empty message)\n");
    } else if detail.text.is_empty() {
        out.push_str(&detail.html_body());
        out.push('\n');
    } else {
        out.push_str(&detail.text_body());
        out.push('\n');
    }
    out
}

fn tab_bar(tab: Tab) -> String {
    [Tab::Active, Tab::History, Tab::Pinned]
        .into_iter()
        .map(|t| {
            let name = match t {
                Tab::Active => "active",
                Tab::History => "history",
                Tab::Pinned => "pinned",
            };
            if t == tab {
                format!("[{name}]")
            } else {
                format!(" {name} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The whole current screen.
pub fn screen<G: MailGateway>(workspace: &Workspace<G>) -> String {
    let view = workspace.view();
    let session = workspace.session();
    let mut out = format!("{}\n", tab_bar(view.tab()));

    match view.view() {
        View::List(Tab::Active) => match session.active() {
            Some(resource) => {
                let _ = writeln!(out, "{}", resource_line(&resource, session.time_left()));
                out.push_str(&message_list(&session.refresh().messages()));
            }
            None => out.push_str("  no active mailbox (`new` creates one)\n"),
        },
        View::List(Tab::History) => {
            let history = workspace.history();
            out.push_str(&entry_list(history.list().into_iter().map(|e| {
                let selected = history.is_selected(&e.resource.id);
                let label = format!(
                    "{}  expired {}",
                    e.resource.address,
                    e.expired_at.format("%Y-%m-%d %H:%M")
                );
                (label, selected)
            })));
        }
        View::List(Tab::Pinned) => {
            let pinned = workspace.pinned();
            out.push_str(&entry_list(
                pinned
                    .list()
                    .into_iter()
                    .map(|e| (e.label(), pinned.is_selected(&e.id))),
            ));
        }
        View::Detail(Scope::History(id), DetailItem::Resource) => {
            let _ = writeln!(out, "{id}");
            match view.listing() {
                Some(messages) => out.push_str(&message_list(messages)),
                None => out.push_str("  loading...\n"),
            }
        }
        View::Detail(_, DetailItem::Pinned(id)) if view.detail().is_none() => {
            let label = workspace
                .pinned()
                .get(id)
                .map_or_else(|| "(removed)".to_string(), |e| e.label());
            let _ = writeln!(out, "{label}");
        }
        View::Detail(..) => match view.detail() {
            Some(detail) => out.push_str(&message_detail(detail)),
            None => out.push_str("  loading...\n"),
        },
    }
    out
}

/// Notice for a session event, if it is worth printing.
pub fn event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Activated(resource) => Some(format!("* new mailbox {}", resource.address)),
        SessionEvent::Extended(resource) => Some(format!(
            "* {} extended until {}",
            resource.address,
            resource.expires_at.format("%H:%M:%S UTC")
        )),
        SessionEvent::Archived(entry) => {
            Some(format!("* {} moved to history", entry.resource.address))
        }
        SessionEvent::Cleared { resource_id, reason } => Some(match reason {
            ClearReason::Deleted => format!("* mailbox {resource_id} deleted"),
            ClearReason::Gone => format!("* mailbox {resource_id} no longer exists upstream"),
        }),
        SessionEvent::MessagesUpdated { new, .. } if *new > 0 => Some(format!(
            "* {new} new message{}",
            if *new == 1 { "" } else { "s" }
        )),
        SessionEvent::RenewalFailed { error, .. } => {
            Some(format!("! renewal failed, retrying: {error}"))
        }
        SessionEvent::MessagesUpdated { .. } | SessionEvent::PollFailed { .. } => None,
    }
}
