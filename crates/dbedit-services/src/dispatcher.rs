//! Action dispatch: one request in, markup or a redirect out

use dbedit_core::{Row, Value};
use dbedit_schema::{
    ALLOW_DELETE_ALIAS, ALLOW_EDIT_ALIAS, Assignment, ColumnConfig, PRIMARY_KEY_ALIAS, SqlBuilder,
    allow_edit_alias, input,
};
use dbedit_templates::{
    CellRenderer, DELETE_CONFIRM_TEMPLATE, DeleteConfirmPage, FORM_TEMPLATE, FormField, FormPage,
    HtmlFilters, SummaryRow, VIEW_TEMPLATE, ViewPage, ViewRow,
};
use serde_json::json;
use uuid::Uuid;

use crate::editor::Editor;
use crate::error::ServiceResult;
use crate::request::{Action, EditorRequest, EditorResponse};
use crate::settings::{HANDLE_PARAM, UPDATED_PARAM};
use crate::url::EditorUrl;

/// Row ids must be plain unsigned integers; anything else is discarded
fn parse_row_id(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Per-render disambiguator for synthetic column aliases
fn temp_field_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("_{}", &id[..12])
}

impl Editor {
    /// Run the action named by the request
    pub async fn execute(
        &mut self,
        request: &EditorRequest,
        prefix: &str,
    ) -> ServiceResult<EditorResponse> {
        self.execute_with(request, prefix, None, None).await
    }

    /// Run an explicit action and row id, falling back to the request for
    /// whichever is `None`
    #[tracing::instrument(skip(self, request), fields(editor = %self.id(), table = %self.config.table))]
    pub async fn execute_with(
        &mut self,
        request: &EditorRequest,
        prefix: &str,
        action: Option<&str>,
        id: Option<&str>,
    ) -> ServiceResult<EditorResponse> {
        let code = action
            .or_else(|| request.param(&self.settings.action_param))
            .unwrap_or("v")
            .to_string();
        let id = parse_row_id(id.or_else(|| request.param(&self.settings.id_param)));

        let Some(mut action) = Action::parse(&code) else {
            tracing::debug!(action = %code, "unknown action");
            return Ok(EditorResponse::Html(String::new()));
        };
        if id.is_none() && matches!(action, Action::Edit | Action::DeleteConfirm) {
            action = Action::View;
        }

        let ctx = Dispatch {
            request,
            prefix,
            suffix: temp_field_suffix(),
            outer_class: self
                .settings
                .outer_classes
                .for_action(action, &format!("{}action_{}", prefix, action.code())),
        };

        let response = match (action, id) {
            (Action::View, _) => self.view(&ctx).await?,
            (Action::Add, _) => self.add(&ctx)?,
            (Action::Insert, _) => self.insert(&ctx).await?,
            (Action::Edit, Some(id)) => self.edit(&ctx, id).await?,
            (Action::Post, Some(id)) => self.post(&ctx, id).await?,
            (Action::DeleteConfirm, Some(id)) => self.delete_confirm(&ctx, id).await?,
            (Action::Delete, Some(id)) => self.delete(&ctx, id).await?,
            (Action::Post | Action::Delete, None) => EditorResponse::Redirect(ctx.url(self, &[], true)),
            (Action::Edit | Action::DeleteConfirm, None) => EditorResponse::Html(String::new()),
        };

        Ok(match response {
            EditorResponse::Html(html) if self.settings.debug && !self.sql_log.is_empty() => {
                EditorResponse::Html(format!(
                    "{}\n<div class=\"{}debug\"><pre>{}</pre></div>",
                    html,
                    prefix,
                    HtmlFilters::escape_html(&self.sql_log.join("\n\n"))
                ))
            }
            other => other,
        })
    }

    async fn view(&mut self, ctx: &Dispatch<'_>) -> ServiceResult<EditorResponse> {
        let stmt = SqlBuilder::new(&self.config, self.connection.dialect()).view_query(&ctx.suffix);
        let result = self.run_query(&stmt).await?;

        let permissions = &self.config.permissions;
        let renderer = CellRenderer::new(&self.formatters);
        let mut rows = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let id = field_text(row, PRIMARY_KEY_ALIAS);
            let editable = permissions.allow_edit
                && (permissions.edit_condition.is_none() || flag(row, ALLOW_EDIT_ALIAS));
            let deletable = permissions.allow_delete
                && (permissions.delete_condition.is_none() || flag(row, ALLOW_DELETE_ALIAS));

            let cells: String = self
                .config
                .columns
                .iter()
                .map(|column| renderer.render_cell(row, &ctx.suffix, column, &self.settings.charset))
                .collect();

            let row_url = |code: &str| {
                ctx.url(
                    &*self,
                    &[
                        (self.settings.action_param.as_str(), code),
                        (self.settings.id_param.as_str(), id.as_str()),
                    ],
                    true,
                )
            };
            rows.push(ViewRow {
                edit_url: editable.then(|| row_url(Action::Edit.code())),
                delete_url: deletable.then(|| row_url(Action::DeleteConfirm.code())),
                cells,
                id,
            });
        }

        let message = match ctx.request.param(UPDATED_PARAM) {
            Some("0") => Some(self.settings.messages.row_not_updated.clone()),
            Some(value) if !value.is_empty() => Some(self.settings.messages.row_updated.clone()),
            _ => None,
        };
        let add_link = if permissions.allow_add {
            let add_url = ctx.url(self, &[(self.settings.action_param.as_str(), "a")], true);
            Some(
                self.templates
                    .render_snippet(&self.settings.markup.add_link, &json!({ "add_url": add_url }))?,
            )
        } else {
            None
        };

        let page = ViewPage {
            prefix: ctx.prefix.to_string(),
            message,
            outer_class: ctx.outer_class.clone(),
            headers: self
                .config
                .columns
                .iter()
                .filter(|column| column.is_displayable())
                .map(|column| column.display_label().to_string())
                .collect(),
            show_delete: permissions.allow_delete,
            delete_header: self.settings.markup.delete_header.clone(),
            delete_link: self.settings.markup.delete_link.clone(),
            rows,
            add_link,
        };
        Ok(EditorResponse::Html(self.templates.render(VIEW_TEMPLATE, &page)?))
    }

    fn add(&self, ctx: &Dispatch<'_>) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_add {
            return Ok(EditorResponse::Html(String::new()));
        }

        let fields = self
            .writable_columns()
            .map(|column| {
                let default = column
                    .default
                    .as_deref()
                    .map(Value::from)
                    .unwrap_or(Value::Null);
                FormField::for_column(column, ctx.prefix, &default, false)
            })
            .collect();

        let page = FormPage {
            submit_id: None,
            submit_label: "Add".to_string(),
            submit_value: Action::Insert.code().to_string(),
            reset: None,
            row_id: None,
            ..self.form_page(ctx, fields)?
        };
        Ok(EditorResponse::Html(self.templates.render(FORM_TEMPLATE, &page)?))
    }

    async fn insert(&mut self, ctx: &Dispatch<'_>) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_add {
            return Ok(EditorResponse::Redirect(ctx.updated_url(self, false)));
        }

        let mut assignments: Vec<Assignment> = self
            .writable_columns()
            .filter_map(|column| submitted_assignment(column, ctx))
            .collect();
        for (column, value) in self.config.columns.constraints() {
            assignments.push(Assignment::param(column.reference_name(), value.to_value()));
        }

        let stmt = SqlBuilder::new(&self.config, self.connection.dialect()).insert(&assignments);
        if let Some(stmt) = stmt {
            self.run_statement(&stmt).await?;
        }
        Ok(EditorResponse::Redirect(ctx.updated_url(self, true)))
    }

    async fn edit(&mut self, ctx: &Dispatch<'_>, id: i64) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_edit {
            return Ok(EditorResponse::Html(String::new()));
        }

        let stmt = SqlBuilder::new(&self.config, self.connection.dialect()).edit_query(id, &ctx.suffix);
        let Some(row) = self.run_query(&stmt).await?.into_first_row() else {
            tracing::debug!(id, "row not found or not editable");
            return Ok(EditorResponse::Html(String::new()));
        };

        let fields = self
            .writable_columns()
            .map(|column| {
                let disabled = row
                    .get_by_name(&allow_edit_alias(&column.field, &ctx.suffix))
                    .is_some_and(|allowed| !allowed.is_truthy());
                let value = row
                    .get_by_name(column.reference_name())
                    .cloned()
                    .unwrap_or(Value::Null);
                FormField::for_column(column, ctx.prefix, &value, disabled)
            })
            .collect();

        let reset = self
            .templates
            .render_snippet(&self.settings.markup.reset, &json!({}))?;
        let page = FormPage {
            submit_id: Some(format!("{}submit", ctx.prefix)),
            submit_label: "Edit".to_string(),
            submit_value: Action::Post.code().to_string(),
            reset: Some(reset),
            row_id: Some(id.to_string()),
            ..self.form_page(ctx, fields)?
        };
        Ok(EditorResponse::Html(self.templates.render(FORM_TEMPLATE, &page)?))
    }

    async fn post(&mut self, ctx: &Dispatch<'_>, id: i64) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_edit {
            return Ok(EditorResponse::Redirect(ctx.updated_url(self, false)));
        }

        let builder = SqlBuilder::new(&self.config, self.connection.dialect());
        let flags = match builder.edit_permission_query(id) {
            Some(stmt) => match self.run_query(&stmt).await?.into_first_row() {
                Some(row) => Some(row),
                None => {
                    tracing::debug!(id, "row not editable, update refused");
                    return Ok(EditorResponse::Redirect(ctx.updated_url(self, false)));
                }
            },
            None => None,
        };

        let dialect = self.connection.dialect();
        let mut assignments: Vec<Assignment> = self
            .writable_columns()
            .filter(|column| match (&column.allow_edit, &flags) {
                (None, _) => true,
                (Some(_), Some(flags)) => flag(flags, &allow_edit_alias(&column.field, "")),
                (Some(_), None) => false,
            })
            .filter_map(|column| submitted_assignment(column, ctx))
            .collect();
        assignments.extend(
            self.other_columns
                .iter()
                .filter_map(|other| input::other_column_assignment(other, dialect)),
        );

        let stmt = SqlBuilder::new(&self.config, dialect).update(id, &assignments);
        if let Some(stmt) = stmt {
            self.run_statement(&stmt).await?;
        }
        Ok(EditorResponse::Redirect(ctx.updated_url(self, true)))
    }

    async fn delete_confirm(&mut self, ctx: &Dispatch<'_>, id: i64) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_delete {
            return Ok(EditorResponse::Html(String::new()));
        }

        let stmt = SqlBuilder::new(&self.config, self.connection.dialect())
            .delete_confirm_query(id, &ctx.suffix);
        let Some(row) = self.run_query(&stmt).await?.into_first_row() else {
            tracing::debug!(id, "row not found or not deletable");
            return Ok(EditorResponse::Html(String::new()));
        };

        let renderer = CellRenderer::new(&self.formatters);
        let rows = self
            .config
            .columns
            .iter()
            .filter(|column| column.is_displayable() && !column.is_joined())
            .map(|column| SummaryRow {
                label: column.display_label().to_string(),
                cell: renderer.render_cell(&row, &ctx.suffix, column, &self.settings.charset),
            })
            .collect();

        let page = DeleteConfirmPage {
            prefix: ctx.prefix.to_string(),
            outer_class: ctx.outer_class.clone(),
            rows,
            action_url: ctx.url(self, &[], false),
            handle_param: HANDLE_PARAM.to_string(),
            handle: self.id().to_string(),
            id_param: self.settings.id_param.clone(),
            row_id: id.to_string(),
            action_param: self.settings.action_param.clone(),
            cancel: self.cancel_button(ctx)?,
        };
        Ok(EditorResponse::Html(
            self.templates.render(DELETE_CONFIRM_TEMPLATE, &page)?,
        ))
    }

    async fn delete(&mut self, ctx: &Dispatch<'_>, id: i64) -> ServiceResult<EditorResponse> {
        if !self.config.permissions.allow_delete {
            return Ok(EditorResponse::Redirect(ctx.updated_url(self, false)));
        }

        let stmt = SqlBuilder::new(&self.config, self.connection.dialect()).delete(id);
        let result = self.run_statement(&stmt).await?;
        if result.affected_rows == 0 && self.config.permissions.delete_condition.is_some() {
            tracing::debug!(id, "row not deletable, delete refused");
            return Ok(EditorResponse::Redirect(ctx.updated_url(self, false)));
        }
        Ok(EditorResponse::Redirect(ctx.url(self, &[], true)))
    }

    /// Columns rendered in forms and accepted from submitted data
    fn writable_columns(&self) -> impl Iterator<Item = &ColumnConfig> {
        let table = &self.config.table;
        self.config
            .columns
            .iter()
            .filter(move |column| column.is_writable(table))
    }

    fn cancel_button(&self, ctx: &Dispatch<'_>) -> ServiceResult<String> {
        let url = ctx.url(self, &[], true);
        Ok(self.templates.render_snippet(
            &self.settings.markup.cancel,
            &json!({ "url": url, "name": self.settings.action_param }),
        )?)
    }

    /// Fields shared by the add and edit forms
    fn form_page(&self, ctx: &Dispatch<'_>, fields: Vec<FormField>) -> ServiceResult<FormPage> {
        Ok(FormPage {
            prefix: ctx.prefix.to_string(),
            outer_class: ctx.outer_class.clone(),
            action_url: ctx.url(self, &[], false),
            fields,
            submit_id: None,
            submit_label: String::new(),
            submit_value: String::new(),
            reset: None,
            cancel: self.cancel_button(ctx)?,
            action_param: self.settings.action_param.clone(),
            handle_param: HANDLE_PARAM.to_string(),
            handle: self.id().to_string(),
            id_param: self.settings.id_param.clone(),
            row_id: None,
        })
    }
}

/// Per-request values shared by the action handlers
struct Dispatch<'a> {
    request: &'a EditorRequest,
    prefix: &'a str,
    suffix: String,
    outer_class: Option<String>,
}

impl Dispatch<'_> {
    fn url(&self, editor: &Editor, set: &[(&str, &str)], with_handle: bool) -> String {
        EditorUrl::new(&self.request.uri, &editor.settings, editor.id()).build(set, with_handle)
    }

    fn updated_url(&self, editor: &Editor, updated: bool) -> String {
        self.url(editor, &[(UPDATED_PARAM, if updated { "1" } else { "0" })], true)
    }

    fn form_name(&self, column: &ColumnConfig) -> String {
        format!("{}{}", self.prefix, column.reference_name())
    }
}

/// Assignment taken from the submitted form for a writable column.
///
/// Checkboxes are always assigned since an unchecked box submits nothing;
/// other columns only when submitted.
fn submitted_assignment(column: &ColumnConfig, ctx: &Dispatch<'_>) -> Option<Assignment> {
    let name = ctx.form_name(column);
    if column.is_checkbox() {
        let present = ctx.request.has_form_field(&name);
        return Some(Assignment::param(
            column.reference_name(),
            input::checkbox_value(present),
        ));
    }
    ctx.request.form_value(&name).map(|submitted| {
        Assignment::param(
            column.reference_name(),
            input::submitted_value(column, submitted),
        )
    })
}

fn field_text(row: &Row, name: &str) -> String {
    row.get_by_name(name)
        .map(Value::to_display_string)
        .unwrap_or_default()
}

fn flag(row: &Row, name: &str) -> bool {
    row.get_by_name(name).is_some_and(Value::is_truthy)
}
