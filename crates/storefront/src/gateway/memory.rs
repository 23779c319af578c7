//! In-process gateway for tests.
//!
//! Mirrors the hosted behavior the storefront relies on: password auth with
//! single-use refresh tokens, row-level security on the three tables, the
//! `(user_id, item_id)` uniqueness constraint, and cascading deletes from
//! `shop_items` to `cart_items`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use uuid::Uuid;

use shopwave_core::{Role, UserId};

use super::{
    AuthEventKind, AuthEvents, AuthSession, Credential, Filter, Gateway, GatewayError, Identity,
    Query, Row, SignUp, Table,
};

const MIN_PASSWORD_LENGTH: usize = 6;
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_NOT_NULL_VIOLATION: &str = "23502";

/// Table operation kinds, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

/// Gateway that keeps accounts and tables in memory.
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    events: AuthEvents,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, MemoryUser>,
    access_tokens: HashMap<String, Identity>,
    refresh_tokens: HashMap<String, Identity>,
    tables: HashMap<Table, Vec<Row>>,
    failures: HashMap<(Table, MemoryOp), String>,
    last_timestamp: Option<DateTime<Utc>>,
    require_confirmation: bool,
}

struct MemoryUser {
    id: UserId,
    password: String,
}

enum Caller {
    Anon,
    User(UserId),
    Service,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    /// Empty gateway with signups auto-confirmed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            events: AuthEvents::new(),
        }
    }

    /// Signups return no session until the address is confirmed.
    #[must_use]
    pub fn with_email_confirmation(self) -> Self {
        self.lock().require_confirmation = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every row in `table`.
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Make the next `op` on `table` fail with `message`.
    pub fn fail_next(&self, table: Table, op: MemoryOp, message: impl Into<String>) {
        self.lock().failures.insert((table, op), message.into());
    }

    /// Invalidate one access token, leaving its refresh token usable.
    pub fn expire_access_token(&self, access_token: &str) {
        self.lock().access_tokens.remove(access_token);
    }

    /// Invalidate every access token belonging to `user_id`, leaving their
    /// refresh tokens usable.
    pub fn expire_access_tokens(&self, user_id: &UserId) {
        self.lock()
            .access_tokens
            .retain(|_, identity| identity.id != *user_id);
    }

    /// Invalidate every token belonging to `user_id`.
    pub fn revoke_sessions(&self, user_id: &UserId) {
        let mut state = self.lock();
        state.access_tokens.retain(|_, identity| identity.id != *user_id);
        state.refresh_tokens.retain(|_, identity| identity.id != *user_id);
    }

    /// Look up an account id by email.
    #[must_use]
    pub fn user_id(&self, email: &str) -> Option<UserId> {
        self.lock().users.get(email).map(|user| user.id.clone())
    }
}

// =============================================================================
// State Helpers
// =============================================================================

impl MemoryState {
    fn issue_session(&mut self, identity: Identity) -> AuthSession {
        let access = format!("access-{}", Uuid::new_v4());
        let refresh = format!("refresh-{}", Uuid::new_v4());
        self.access_tokens.insert(access.clone(), identity.clone());
        self.refresh_tokens.insert(refresh.clone(), identity.clone());

        AuthSession {
            access_token: SecretString::from(access),
            refresh_token: SecretString::from(refresh),
            user: identity,
        }
    }

    /// Strictly increasing timestamps so string order matches insertion order.
    fn next_timestamp(&mut self) -> String {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn take_failure(&mut self, table: Table, op: MemoryOp) -> Result<(), GatewayError> {
        match self.failures.remove(&(table, op)) {
            Some(message) => Err(GatewayError::Api {
                status: 500,
                code: "XX000".to_owned(),
                message,
            }),
            None => Ok(()),
        }
    }

    fn caller(&self, cred: Credential<'_>) -> Result<Caller, GatewayError> {
        match cred {
            Credential::Anon => Ok(Caller::Anon),
            Credential::Service => Ok(Caller::Service),
            Credential::User(token) => self
                .access_tokens
                .get(token.expose_secret())
                .map(|identity| Caller::User(identity.id.clone()))
                .ok_or(GatewayError::TokenExpired),
        }
    }

    fn is_admin(&self, user_id: &UserId) -> bool {
        self.tables
            .get(&Table::Profiles)
            .into_iter()
            .flatten()
            .any(|row| {
                text(row.get("id")) == user_id.as_str()
                    && text(row.get("role")) == Role::Admin.as_str()
            })
    }

    /// Row-level read policy.
    fn can_read(caller: &Caller, table: Table, row: &Row) -> bool {
        match (caller, table) {
            (Caller::Service, _) | (_, Table::ShopItems) => true,
            (Caller::User(uid), Table::Profiles) => text(row.get("id")) == uid.as_str(),
            (Caller::User(uid), Table::CartItems) => text(row.get("user_id")) == uid.as_str(),
            (Caller::Anon, _) => false,
        }
    }

    /// Row-level write policy.
    fn can_write(&self, caller: &Caller, table: Table, row: &Row) -> bool {
        match (caller, table) {
            (Caller::Service, _) => true,
            (Caller::Anon, _) => false,
            (Caller::User(uid), Table::ShopItems) => self.is_admin(uid),
            (Caller::User(uid), Table::Profiles) => {
                text(row.get("id")) == uid.as_str()
                    && text(row.get("role")) == Role::User.as_str()
            }
            (Caller::User(uid), Table::CartItems) => text(row.get("user_id")) == uid.as_str(),
        }
    }

    fn table(&mut self, table: Table) -> &mut Vec<Row> {
        self.tables.entry(table).or_default()
    }

    fn check_constraints(&self, table: Table, row: &Row, skip: Option<usize>) -> Result<(), GatewayError> {
        let existing = self.tables.get(&table).map(Vec::as_slice).unwrap_or_default();
        let others = existing
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != skip)
            .map(|(_, other)| other);

        match table {
            Table::Profiles => {
                if others.into_iter().any(|other| other.get("id") == row.get("id")) {
                    return Err(GatewayError::Conflict(
                        "duplicate key value violates unique constraint \"profiles_pkey\"".to_owned(),
                    ));
                }
            }
            Table::CartItems => {
                if others.into_iter().any(|other| {
                    other.get("user_id") == row.get("user_id")
                        && other.get("item_id") == row.get("item_id")
                }) {
                    return Err(GatewayError::Conflict(
                        "duplicate key value violates unique constraint \"cart_items_user_id_item_id_key\""
                            .to_owned(),
                    ));
                }
                let item_id = text(row.get("item_id"));
                let item_exists = self
                    .tables
                    .get(&Table::ShopItems)
                    .into_iter()
                    .flatten()
                    .any(|item| text(item.get("id")) == item_id);
                if !item_exists {
                    return Err(GatewayError::Api {
                        status: 409,
                        code: PG_FOREIGN_KEY_VIOLATION.to_owned(),
                        message: "insert or update on table \"cart_items\" violates foreign key constraint"
                            .to_owned(),
                    });
                }
            }
            Table::ShopItems => {
                if matches!(row.get("name"), None | Some(Value::Null)) {
                    return Err(GatewayError::Api {
                        status: 400,
                        code: PG_NOT_NULL_VIOLATION.to_owned(),
                        message: "null value in column \"name\" violates not-null constraint"
                            .to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    fn insert_row(&mut self, caller: &Caller, table: Table, mut row: Row) -> Result<(), GatewayError> {
        if !self.can_write(caller, table, &row) {
            return Err(GatewayError::Forbidden(format!(
                "new row violates row-level security policy for table \"{table}\""
            )));
        }

        if table != Table::Profiles && !row.contains_key("id") {
            row.insert("id".to_owned(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("id") {
            return Err(GatewayError::Api {
                status: 400,
                code: PG_NOT_NULL_VIOLATION.to_owned(),
                message: "null value in column \"id\" violates not-null constraint".to_owned(),
            });
        }
        let now = self.next_timestamp();
        row.entry("created_at").or_insert_with(|| Value::String(now.clone()));
        if table == Table::ShopItems {
            row.insert("updated_at".to_owned(), Value::String(now));
        }
        if table == Table::CartItems {
            row.entry("quantity").or_insert_with(|| Value::from(1));
        }

        self.check_constraints(table, &row, None)?;
        self.table(table).push(row);
        Ok(())
    }

    fn update_rows(
        &mut self,
        caller: &Caller,
        table: Table,
        filters: &[Filter],
        patch: &Row,
    ) -> Result<(), GatewayError> {
        let indexes: Vec<usize> = self
            .tables
            .get(&table)
            .into_iter()
            .flatten()
            .enumerate()
            .filter(|(_, row)| matches_filters(row, filters) && Self::can_read(caller, table, row))
            .map(|(index, _)| index)
            .collect();

        let now = self.next_timestamp();
        for index in indexes {
            let Some(mut row) = self.tables.get(&table).and_then(|rows| rows.get(index)).cloned()
            else {
                continue;
            };
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
            if table == Table::ShopItems {
                row.insert("updated_at".to_owned(), Value::String(now.clone()));
            }
            if !self.can_write(caller, table, &row) {
                return Err(GatewayError::Forbidden(format!(
                    "row-level security policy denied update on \"{table}\""
                )));
            }
            self.check_constraints(table, &row, Some(index))?;
            if let Some(slot) = self.table(table).get_mut(index) {
                *slot = row;
            }
        }
        Ok(())
    }
}

/// Column value as text, the way filters compare it.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn matches_filters(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|filter| text(row.get(filter.column)) == filter.value)
}

// =============================================================================
// Gateway Implementation
// =============================================================================

#[async_trait]
impl Gateway for MemoryGateway {
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp, GatewayError> {
        let password = password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(GatewayError::WeakPassword(
                "Password should be at least 6 characters.".to_owned(),
            ));
        }

        let mut state = self.lock();
        if state.users.contains_key(email) {
            return Err(GatewayError::UserAlreadyExists);
        }

        let identity = Identity {
            id: UserId::new(Uuid::new_v4().to_string()),
            email: email.to_owned(),
        };
        state.users.insert(
            email.to_owned(),
            MemoryUser {
                id: identity.id.clone(),
                password: password.to_owned(),
            },
        );

        if state.require_confirmation {
            return Ok(SignUp {
                identity,
                session: None,
            });
        }

        let session = state.issue_session(identity.clone());
        drop(state);
        self.events.emit(AuthEventKind::SignedIn, &identity.id);
        Ok(SignUp {
            identity,
            session: Some(session),
        })
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let mut state = self.lock();
        let id = state
            .users
            .get(email)
            .filter(|user| user.password == password.expose_secret())
            .map(|user| user.id.clone())
            .ok_or(GatewayError::InvalidCredentials)?;

        let session = state.issue_session(Identity {
            id,
            email: email.to_owned(),
        });
        drop(state);
        self.events.emit(AuthEventKind::SignedIn, &session.user.id);
        Ok(session)
    }

    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let mut state = self.lock();
        let identity = state
            .refresh_tokens
            .remove(refresh_token.expose_secret())
            .ok_or(GatewayError::TokenExpired)?;

        let session = state.issue_session(identity);
        drop(state);
        self.events
            .emit(AuthEventKind::TokenRefreshed, &session.user.id);
        Ok(session)
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), GatewayError> {
        let identity = self
            .lock()
            .access_tokens
            .get(access_token.expose_secret())
            .cloned()
            .ok_or(GatewayError::TokenExpired)?;

        self.revoke_sessions(&identity.id);
        self.events.emit(AuthEventKind::SignedOut, &identity.id);
        Ok(())
    }

    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, GatewayError> {
        self.lock()
            .access_tokens
            .get(access_token.expose_secret())
            .cloned()
            .map(Some)
            .ok_or(GatewayError::TokenExpired)
    }

    fn auth_events(&self) -> &AuthEvents {
        &self.events
    }

    async fn select(&self, cred: Credential<'_>, query: &Query) -> Result<Vec<Row>, GatewayError> {
        let mut state = self.lock();
        state.take_failure(query.table, MemoryOp::Select)?;
        let caller = state.caller(cred)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(&query.table)
            .into_iter()
            .flatten()
            .filter(|row| matches_filters(row, &query.filters))
            .filter(|row| MemoryState::can_read(&caller, query.table, row))
            .cloned()
            .collect();

        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ordering = text(a.get(order.column)).cmp(&text(b.get(order.column)));
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        if let Some(embed) = query.embed {
            for row in &mut rows {
                let key = text(row.get(embed.foreign_key));
                let foreign = state
                    .tables
                    .get(&embed.table)
                    .into_iter()
                    .flatten()
                    .find(|candidate| text(candidate.get("id")) == key)
                    .filter(|candidate| MemoryState::can_read(&caller, embed.table, candidate))
                    .cloned()
                    .map_or(Value::Null, Value::Object);
                row.insert(embed.table.as_str().to_owned(), foreign);
            }
        }

        Ok(rows)
    }

    async fn select_single(
        &self,
        cred: Credential<'_>,
        query: &Query,
    ) -> Result<Row, GatewayError> {
        let mut rows = self.select(cred, query).await?;
        if rows.len() == 1 {
            rows.pop().ok_or(GatewayError::NotFound)
        } else {
            Err(GatewayError::NotFound)
        }
    }

    async fn insert(
        &self,
        cred: Credential<'_>,
        table: Table,
        row: Row,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.take_failure(table, MemoryOp::Insert)?;
        let caller = state.caller(cred)?;
        state.insert_row(&caller, table, row)
    }

    async fn update(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
        patch: Row,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.take_failure(table, MemoryOp::Update)?;
        let caller = state.caller(cred)?;
        state.update_rows(&caller, table, filters, &patch)
    }

    async fn delete(
        &self,
        cred: Credential<'_>,
        table: Table,
        filters: &[Filter],
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.take_failure(table, MemoryOp::Delete)?;
        let caller = state.caller(cred)?;

        let mut removed_ids = Vec::new();
        let mut denied = false;
        let rows = state.tables.remove(&table).unwrap_or_default();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let visible = matches_filters(&row, filters) && MemoryState::can_read(&caller, table, &row);
            if visible && state.can_write(&caller, table, &row) {
                removed_ids.push(text(row.get("id")));
            } else {
                denied |= visible;
                kept.push(row);
            }
        }
        state.tables.insert(table, kept);

        if denied {
            return Err(GatewayError::Forbidden(format!(
                "row-level security policy denied delete on \"{table}\""
            )));
        }

        if table == Table::ShopItems && !removed_ids.is_empty() {
            state
                .table(Table::CartItems)
                .retain(|row| !removed_ids.contains(&text(row.get("item_id"))));
        }
        Ok(())
    }

    async fn upsert(
        &self,
        cred: Credential<'_>,
        table: Table,
        row: Row,
        on_conflict: &[&'static str],
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.take_failure(table, MemoryOp::Upsert)?;
        let caller = state.caller(cred)?;

        let filters: Vec<Filter> = on_conflict
            .iter()
            .map(|column| Filter::eq(*column, text(row.get(*column))))
            .collect();
        let exists = state
            .tables
            .get(&table)
            .into_iter()
            .flatten()
            .any(|existing| matches_filters(existing, &filters));

        if exists {
            state.update_rows(&caller, table, &filters, &row)
        } else {
            state.insert_row(&caller, table, row)
        }
    }

    async fn health(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::gateway::to_row;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_owned())
    }

    async fn seed_item(gateway: &MemoryGateway, name: &str) -> String {
        gateway
            .insert(
                Credential::Service,
                Table::ShopItems,
                to_row(&json!({ "name": name, "price": "1.00", "in_stock": true })).unwrap(),
            )
            .await
            .unwrap();
        let rows = gateway.rows(Table::ShopItems);
        text(rows.last().unwrap().get("id"))
    }

    #[tokio::test]
    async fn test_sign_up_rules() {
        let gateway = MemoryGateway::new();

        let err = gateway.sign_up("a@b.io", &secret("123")).await.unwrap_err();
        assert!(matches!(err, GatewayError::WeakPassword(_)));

        let sign_up = gateway.sign_up("a@b.io", &secret("hunter22")).await.unwrap();
        assert!(sign_up.session.is_some());

        let err = gateway.sign_up("a@b.io", &secret("hunter22")).await.unwrap_err();
        assert!(matches!(err, GatewayError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_refresh_tokens_are_single_use() {
        let gateway = MemoryGateway::new();
        gateway.sign_up("a@b.io", &secret("hunter22")).await.unwrap();
        let session = gateway.sign_in("a@b.io", &secret("hunter22")).await.unwrap();

        gateway.expire_access_token(session.access_token.expose_secret());
        assert!(matches!(
            gateway.current_user(&session.access_token).await,
            Err(GatewayError::TokenExpired)
        ));

        let refreshed = gateway.refresh_session(&session.refresh_token).await.unwrap();
        assert!(gateway.current_user(&refreshed.access_token).await.unwrap().is_some());
        assert!(gateway.refresh_session(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_expiring_a_users_access_tokens_spares_others() {
        let gateway = MemoryGateway::new();
        gateway.sign_up("a@b.io", &secret("hunter22")).await.unwrap();
        gateway.sign_up("c@d.io", &secret("hunter22")).await.unwrap();
        let ada = gateway.sign_in("a@b.io", &secret("hunter22")).await.unwrap();
        let cy = gateway.sign_in("c@d.io", &secret("hunter22")).await.unwrap();

        gateway.expire_access_tokens(&ada.user.id);
        assert!(gateway.current_user(&ada.access_token).await.is_err());
        assert!(gateway.current_user(&cy.access_token).await.unwrap().is_some());
        assert!(gateway.refresh_session(&ada.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let gateway = MemoryGateway::new();
        seed_item(&gateway, "First").await;
        seed_item(&gateway, "Second").await;

        let rows = gateway.rows(Table::ShopItems);
        let first = text(rows[0].get("created_at"));
        let second = text(rows[1].get("created_at"));
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_cart_pair_is_unique_and_cascades() {
        let gateway = MemoryGateway::new();
        let item_id = seed_item(&gateway, "Lamp").await;
        let row = to_row(&json!({ "user_id": "u-1", "item_id": item_id })).unwrap();

        gateway
            .insert(Credential::Service, Table::CartItems, row.clone())
            .await
            .unwrap();
        let err = gateway
            .insert(Credential::Service, Table::CartItems, row.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));

        gateway
            .upsert(Credential::Service, Table::CartItems, row, &["user_id", "item_id"])
            .await
            .unwrap();
        assert_eq!(gateway.rows(Table::CartItems).len(), 1);

        gateway
            .delete(Credential::Service, Table::ShopItems, &[Filter::eq("id", item_id)])
            .await
            .unwrap();
        assert!(gateway.rows(Table::CartItems).is_empty());
    }

    #[tokio::test]
    async fn test_row_level_security() {
        let gateway = MemoryGateway::new();
        let sign_up = gateway.sign_up("a@b.io", &secret("hunter22")).await.unwrap();
        let token = sign_up.session.unwrap().access_token;
        let uid = sign_up.identity.id;

        // Users may create their own profile, only with the user role.
        let own = to_row(&json!({ "id": uid, "role": "admin" })).unwrap();
        assert!(matches!(
            gateway.insert(Credential::User(&token), Table::Profiles, own).await,
            Err(GatewayError::Forbidden(_))
        ));
        let own = to_row(&json!({ "id": uid, "role": "user" })).unwrap();
        gateway
            .insert(Credential::User(&token), Table::Profiles, own)
            .await
            .unwrap();

        // Catalog writes require the admin role.
        let item = to_row(&json!({ "name": "Lamp", "price": "1.00", "in_stock": true })).unwrap();
        assert!(matches!(
            gateway.insert(Credential::User(&token), Table::ShopItems, item).await,
            Err(GatewayError::Forbidden(_))
        ));

        // Anonymous callers see no profiles.
        let rows = gateway
            .select(Credential::Anon, &Query::from(Table::Profiles))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(Table::ShopItems, MemoryOp::Select, "boom");

        let query = Query::from(Table::ShopItems);
        assert!(gateway.select(Credential::Anon, &query).await.is_err());
        assert!(gateway.select(Credential::Anon, &query).await.is_ok());
    }

    #[tokio::test]
    async fn test_select_embeds_foreign_row() {
        let gateway = MemoryGateway::new();
        let item_id = seed_item(&gateway, "Lamp").await;
        gateway
            .insert(
                Credential::Service,
                Table::CartItems,
                to_row(&json!({ "user_id": "u-1", "item_id": item_id })).unwrap(),
            )
            .await
            .unwrap();

        let rows = gateway
            .select(
                Credential::Service,
                &Query::from(Table::CartItems).embed(Table::ShopItems, "item_id"),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["shop_items"]["name"], "Lamp");
    }
}
