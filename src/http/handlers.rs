use axum::{extract::State, Json};

use crate::auth::AuthUser;
use crate::http::body::{DeleteRuleRequest, EditRuleRequest, RuleBody, SaveRulesRequest};
use crate::http::error::{ApiError, MessageBody};
use crate::http::server::AppState;
use crate::rules::{encode_line, RuleRecord};

pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleBody>> {
    let rules = state.rules.list();
    Json(rules.iter().map(RuleBody::from).collect())
}

pub async fn preview_rules(State(state): State<AppState>) -> Json<Vec<String>> {
    let rules = state.rules.list();
    Json(rules.iter().map(encode_line).collect())
}

pub async fn edit_rule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<EditRuleRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let index = to_index(req.index)?;
    let updated = state.rules.edit_at(index, &req.patch()).await?;

    tracing::info!(
        user = %user.username,
        index,
        rule = %encode_line(&updated),
        "Rule edited"
    );
    Ok(MessageBody::new("rule updated"))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<DeleteRuleRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let index = to_index(req.index)?;
    let removed = state.rules.delete_at(index).await?;

    tracing::info!(
        user = %user.username,
        index,
        rule = %encode_line(&removed),
        "Rule deleted"
    );
    Ok(MessageBody::new("rule deleted"))
}

pub async fn save_rules(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SaveRulesRequest>,
) -> Result<Json<MessageBody>, ApiError> {
    let rules = req
        .rules
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            RuleRecord::try_from(body).map_err(|source| ApiError::InvalidRuleBody { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let count = rules.len();
    let warnings = state.rules.replace_and_persist(rules).await?;

    tracing::info!(
        user = %user.username,
        rules = count,
        path = %state.rules.path().display(),
        "Rules saved"
    );

    if warnings.is_empty() {
        Ok(MessageBody::new("rules saved"))
    } else {
        Ok(MessageBody::new(format!(
            "rules saved; {} line(s) were rejected on reload",
            warnings.len()
        )))
    }
}

pub async fn reload_rules(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessageBody>, ApiError> {
    let warnings = state.rules.reload().await?;
    tracing::info!(user = %user.username, rules = state.rules.len(), "Rules reloaded");
    Ok(MessageBody::new(format!(
        "reloaded {} rule(s), {} line(s) rejected",
        state.rules.len(),
        warnings.len()
    )))
}

pub async fn healthz() -> &'static str {
    "ok"
}

fn to_index(index: i64) -> Result<usize, ApiError> {
    usize::try_from(index).map_err(|_| ApiError::InvalidIndex(index))
}
