use catalog::{CatalogError, Group, Layout};
use color_eyre::Result;
use strum::VariantNames;

use crate::{
    components::popups::form::{Commit, FieldValues, Form, FormField, FormFieldKind, FormSchema},
    state::AppState,
};

use super::{no_whitespace, with_mode};

fn schema(title: &str, state: &AppState) -> FormSchema {
    let schema = FormSchema::new(
        title,
        vec![
            FormField::new("name", "Name", FormFieldKind::Text)
                .required()
                .validator(no_whitespace),
            FormField::new("description", "Description", FormFieldKind::Text),
            FormField::new("layout", "Layout", FormFieldKind::select(Layout::VARIANTS.iter().copied()))
                .help("tmux layout for the profile's panes"),
        ],
    )
    .description("A profile opens all of its hosts side by side in one tmux window.")
    .min_size(60, 18);
    with_mode(schema, state)
}

fn layout_of(values: &FieldValues) -> Result<Layout, String> {
    let raw = values.get("layout").map(String::as_str).unwrap_or("");
    raw.parse().map_err(|_| format!("unknown layout `{raw}`"))
}

pub fn new_profile(state: &AppState) -> Result<Form<AppState>> {
    let form = Form::new(
        schema("New profile", state),
        |values: &FieldValues, state: &mut AppState| {
            let mut group = Group::new(values["name"].trim());
            group.description = values["description"].trim().to_string();
            group.layout = layout_of(values)?;
            let name = group.name.clone();
            state
                .store
                .update(|c| c.add_group(group))
                .map_err(|e| e.to_string())?;
            state.info(format!("profile `{name}` created"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

/// Edit name, description and layout. Membership is kept as is.
pub fn edit_profile(state: &AppState, name: &str) -> Result<Form<AppState>> {
    let group = state
        .store
        .catalog()
        .group(name)
        .ok_or_else(|| CatalogError::UnknownGroup(name.to_string()))?
        .clone();
    let prefill = [
        ("name", group.name.clone()),
        ("description", group.description.clone()),
        ("layout", group.layout.to_string()),
    ];

    let form = Form::new(
        schema(&format!("Edit profile `{}`", group.name), state),
        move |values: &FieldValues, state: &mut AppState| {
            let mut next = group.clone();
            next.name = values["name"].trim().to_string();
            next.description = values["description"].trim().to_string();
            next.layout = layout_of(values)?;
            let label = next.name.clone();
            state
                .store
                .update(|c| c.update_group(&group.name, next))
                .map_err(|e| e.to_string())?;
            state.info(format!("profile `{label}` updated"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?
    .with_values(prefill)?;
    Ok(form)
}
