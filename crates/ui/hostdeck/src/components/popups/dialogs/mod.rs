//! Catalog dialogs, all built on the form engine.
//!
//! Every builder returns a ready `Form<AppState>` whose commit callback talks
//! to the catalog store (or the task manager, for connect). `open` maps a
//! `Dialog` request from a page onto the matching popup.
use color_eyre::Result;

use crate::{
    action::{Action, Dialog},
    components::Component,
    state::AppState,
};

use super::{
    confirm::ConfirmPopup,
    form::{FormPopup, FormSchema},
};

pub mod connect;
pub mod host;
pub mod membership;
pub mod profile;
pub mod transfer;

/// Build the popup for `dialog` against the current state.
pub fn open(dialog: &Dialog, state: &AppState) -> Result<Box<dyn Component>> {
    let form = match dialog {
        Dialog::AddHost => host::add_host(state)?,
        Dialog::EditHost(name) => host::edit_host(state, name)?,
        Dialog::NewProfile => profile::new_profile(state)?,
        Dialog::EditProfile(name) => profile::edit_profile(state, name)?,
        Dialog::Assign { host } => membership::assign(state, host.as_deref())?,
        Dialog::Unassign { profile } => membership::unassign(state, profile.as_deref())?,
        Dialog::Import => transfer::import(state)?,
        Dialog::Export { profile } => transfer::export(state, profile.as_deref())?,
        Dialog::Connect(target) => connect::connect(state, target)?,
        Dialog::DeleteHost(name) => {
            return Ok(Box::new(
                ConfirmPopup::new(
                    "Delete host",
                    format!("Delete host `{name}`?\nIt is also removed from every profile."),
                    Action::RemoveHost(name.clone()),
                )
                .ok_label("Delete"),
            ));
        }
        Dialog::DeleteProfile(name) => {
            return Ok(Box::new(
                ConfirmPopup::new(
                    "Delete profile",
                    format!("Delete profile `{name}`?\nIts hosts are kept."),
                    Action::RemoveProfile(name.clone()),
                )
                .ok_label("Delete"),
            ));
        }
    };
    Ok(Box::new(FormPopup::new(form)))
}

/// Apply the configured validation mode.
fn with_mode(schema: FormSchema, state: &AppState) -> FormSchema {
    schema.validation_mode(state.config.validation_mode.into())
}

fn no_whitespace(value: &str) -> Result<(), String> {
    if value.chars().any(char::is_whitespace) {
        Err("Must not contain whitespace".into())
    } else {
        Ok(())
    }
}

fn port(value: &str) -> Result<(), String> {
    match value.trim().parse::<u16>() {
        Ok(p) if p >= 1 => Ok(()),
        _ => Err("Must be a port between 1 and 65535".into()),
    }
}

/// Empty optional text becomes `None`.
fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
