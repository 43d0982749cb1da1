use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use log::info;
use std::collections::HashMap;
use uuid::Uuid;

use super::schema::{
    accounts, contact_origins, contact_tags, contacts, origin_members, origins, pipeline_stages,
    tags,
};
use super::{CrmStore, StoreError, StoreResult};
use crate::core::shared::models::{
    Account, Contact, ContactOrigin, ContactScope, NewAccount, Origin, OriginMembership,
    OriginScope, Role, Stage, Tag,
};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn create_pool(database_url: &str, max_size: u32) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {e}"))
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

    const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {e}"))?;
    info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Duplicate(describe_constraint(info.constraint_name()).to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::MissingReference(
                    describe_constraint(info.constraint_name()).to_string(),
                )
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

fn describe_constraint(name: Option<&str>) -> &'static str {
    match name.unwrap_or_default() {
        "accounts_email_key" => "account email",
        "accounts_manager_id_fkey" => "manager account",
        "contacts_owning_user_id_fkey" => "owning account",
        "contacts_manager_id_fkey" => "manager account",
        "contacts_stage_id_fkey" => "stage",
        "pipeline_stages_origin_id_fkey" => "origin",
        "pipeline_stages_origin_order_key" => "stage position",
        "origin_members_pkey" => "membership",
        "origin_members_origin_id_fkey" => "origin",
        "origin_members_user_id_fkey" => "account",
        "contact_origins_pkey" => "contact placement",
        "contact_origins_contact_id_fkey" => "contact",
        "contact_origins_origin_id_fkey" => "origin",
        "tags_name_key" => "tag",
        "contact_tags_pkey" => "contact tag",
        "contact_tags_contact_id_fkey" => "contact",
        "contact_tags_tag_id_fkey" => "tag",
        _ => "record",
    }
}

fn parse_role<T: std::str::FromStr<Err = String>>(raw: &str) -> StoreResult<T> {
    raw.parse().map_err(StoreError::Query)
}

#[derive(Insertable)]
#[diesel(table_name = accounts)]
struct NewAccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    manager_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

/// Account columns without the password hash.
#[derive(Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AccountRecord {
    id: Uuid,
    email: String,
    role: String,
    manager_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRecord> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRecord) -> StoreResult<Self> {
        Ok(Account {
            id: row.id,
            email: row.email,
            role: parse_role::<Role>(&row.role)?,
            manager_id: row.manager_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = contacts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ContactRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    owning_user_id: Uuid,
    manager_id: Option<Uuid>,
    stage_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            owning_user_id: row.owning_user_id,
            manager_id: row.manager_id,
            stage_id: row.stage_id,
            created_at: row.created_at,
        }
    }
}

impl From<Contact> for ContactRow {
    fn from(c: Contact) -> Self {
        ContactRow {
            id: c.id,
            name: c.name,
            email: c.email,
            phone: c.phone,
            owning_user_id: c.owning_user_id,
            manager_id: c.manager_id,
            stage_id: c.stage_id,
            created_at: c.created_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = origins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct OriginRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OriginRow> for Origin {
    fn from(row: OriginRow) -> Self {
        Origin {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = pipeline_stages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct StageRow {
    id: Uuid,
    origin_id: Uuid,
    name: String,
    color: String,
    order_num: i32,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            origin_id: row.origin_id,
            name: row.name,
            color: row.color,
            order_num: row.order_num,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = origin_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MembershipRow {
    origin_id: Uuid,
    user_id: Uuid,
    role: String,
}

impl TryFrom<MembershipRow> for OriginMembership {
    type Error = StoreError;

    fn try_from(row: MembershipRow) -> StoreResult<Self> {
        Ok(OriginMembership {
            origin_id: row.origin_id,
            user_id: row.user_id,
            role: parse_role(&row.role)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TagRow {
    id: Uuid,
    name: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

fn into_accounts(rows: Vec<AccountRecord>) -> StoreResult<Vec<Account>> {
    rows.into_iter().map(Account::try_from).collect()
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs a blocking diesel closure on the blocking thread pool.
    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Query(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl CrmStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        self.run(move |conn| {
            let row = NewAccountRow {
                id: account.id,
                email: account.email,
                password_hash: account.password_hash,
                role: account.role.as_str().to_string(),
                manager_id: account.manager_id,
                created_at: account.created_at,
            };
            let record = diesel::insert_into(accounts::table)
                .values(&row)
                .returning(AccountRecord::as_returning())
                .get_result(conn)?;
            Account::try_from(record)
        })
        .await
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.run(move |conn| {
            accounts::table
                .find(id)
                .select(AccountRecord::as_select())
                .first(conn)
                .optional()?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let email = email.to_string();
        self.run(move |conn| {
            accounts::table
                .filter(accounts::email.eq(email))
                .select(AccountRecord::as_select())
                .first(conn)
                .optional()?
                .map(Account::try_from)
                .transpose()
        })
        .await
    }

    async fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>> {
        self.run(move |conn| {
            Ok(accounts::table
                .find(id)
                .select(accounts::password_hash)
                .first::<String>(conn)
                .optional()?)
        })
        .await
    }

    async fn list_accounts(&self, role: Option<Role>) -> StoreResult<Vec<Account>> {
        self.run(move |conn| {
            let mut query = accounts::table
                .select(AccountRecord::as_select())
                .order(accounts::email.asc())
                .into_boxed();
            if let Some(role) = role {
                query = query.filter(accounts::role.eq(role.as_str()));
            }
            into_accounts(query.load(conn)?)
        })
        .await
    }

    async fn list_subordinates(&self, manager_id: Uuid) -> StoreResult<Vec<Account>> {
        self.run(move |conn| {
            let rows = accounts::table
                .filter(accounts::manager_id.eq(manager_id))
                .filter(accounts::role.eq(Role::Seller.as_str()))
                .select(AccountRecord::as_select())
                .order(accounts::email.asc())
                .load(conn)?;
            into_accounts(rows)
        })
        .await
    }

    async fn account_emails(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = ids.to_vec();
        self.run(move |conn| {
            let rows = accounts::table
                .filter(accounts::id.eq_any(ids))
                .select((accounts::id, accounts::email))
                .load::<(Uuid, String)>(conn)?;
            Ok(rows.into_iter().collect())
        })
        .await
    }

    async fn list_contacts(&self, scope: &ContactScope) -> StoreResult<Vec<Contact>> {
        let scope = scope.clone();
        self.run(move |conn| {
            let mut query = contacts::table
                .select(ContactRow::as_select())
                .order(contacts::created_at.desc())
                .into_boxed();
            if let ContactScope::OwnedBy(owners) = scope {
                query = query.filter(contacts::owning_user_id.eq_any(owners));
            }
            let rows = query.load(conn)?;
            Ok(rows.into_iter().map(Contact::from).collect())
        })
        .await
    }

    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        self.run(move |conn| {
            Ok(contacts::table
                .find(id)
                .select(ContactRow::as_select())
                .first(conn)
                .optional()?
                .map(Contact::from))
        })
        .await
    }

    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        self.run(move |conn| {
            let row = diesel::insert_into(contacts::table)
                .values(ContactRow::from(contact))
                .returning(ContactRow::as_returning())
                .get_result(conn)?;
            Ok(Contact::from(row))
        })
        .await
    }

    async fn update_contact(&self, contact: Contact) -> StoreResult<Option<Contact>> {
        self.run(move |conn| {
            let row = diesel::update(contacts::table.find(contact.id))
                .set((
                    contacts::name.eq(contact.name),
                    contacts::email.eq(contact.email),
                    contacts::phone.eq(contact.phone),
                    contacts::owning_user_id.eq(contact.owning_user_id),
                    contacts::manager_id.eq(contact.manager_id),
                ))
                .returning(ContactRow::as_returning())
                .get_result(conn)
                .optional()?;
            Ok(row.map(Contact::from))
        })
        .await
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            let deleted = diesel::delete(contacts::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn set_contact_stage(
        &self,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        self.run(move |conn| {
            let updated = diesel::update(contacts::table.find(contact_id))
                .set(contacts::stage_id.eq(stage_id))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn list_origins(&self, scope: &OriginScope) -> StoreResult<Vec<Origin>> {
        let scope = scope.clone();
        self.run(move |conn| {
            let mut query = origins::table
                .select(OriginRow::as_select())
                .order(origins::created_at.desc())
                .into_boxed();
            if let OriginScope::Only(ids) = scope {
                query = query.filter(origins::id.eq_any(ids));
            }
            let rows = query.load(conn)?;
            Ok(rows.into_iter().map(Origin::from).collect())
        })
        .await
    }

    async fn get_origin(&self, id: Uuid) -> StoreResult<Option<Origin>> {
        self.run(move |conn| {
            Ok(origins::table
                .find(id)
                .select(OriginRow::as_select())
                .first(conn)
                .optional()?
                .map(Origin::from))
        })
        .await
    }

    async fn insert_origin(&self, origin: Origin) -> StoreResult<Origin> {
        self.run(move |conn| {
            let row = OriginRow {
                id: origin.id,
                name: origin.name,
                description: origin.description,
                created_at: origin.created_at,
            };
            let row = diesel::insert_into(origins::table)
                .values(&row)
                .returning(OriginRow::as_returning())
                .get_result(conn)?;
            Ok(Origin::from(row))
        })
        .await
    }

    async fn delete_origin(&self, id: Uuid) -> StoreResult<bool> {
        // Stages, memberships and placements go through ON DELETE CASCADE;
        // contacts.stage_id is nulled by ON DELETE SET NULL on the stages.
        self.run(move |conn| {
            let deleted = diesel::delete(origins::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_stages(&self, scope: &OriginScope) -> StoreResult<Vec<Stage>> {
        let scope = scope.clone();
        self.run(move |conn| {
            let mut query = pipeline_stages::table
                .select(StageRow::as_select())
                .order((pipeline_stages::order_num.asc(), pipeline_stages::name.asc()))
                .into_boxed();
            if let OriginScope::Only(ids) = scope {
                query = query.filter(pipeline_stages::origin_id.eq_any(ids));
            }
            let rows = query.load(conn)?;
            Ok(rows.into_iter().map(Stage::from).collect())
        })
        .await
    }

    async fn stages_for_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Stage>> {
        self.run(move |conn| {
            let rows = pipeline_stages::table
                .filter(pipeline_stages::origin_id.eq(origin_id))
                .select(StageRow::as_select())
                .order(pipeline_stages::order_num.asc())
                .load(conn)?;
            Ok(rows.into_iter().map(Stage::from).collect())
        })
        .await
    }

    async fn get_stage(&self, id: Uuid) -> StoreResult<Option<Stage>> {
        self.run(move |conn| {
            Ok(pipeline_stages::table
                .find(id)
                .select(StageRow::as_select())
                .first(conn)
                .optional()?
                .map(Stage::from))
        })
        .await
    }

    async fn insert_stage(&self, stage: Stage) -> StoreResult<Stage> {
        self.run(move |conn| {
            let row = StageRow {
                id: stage.id,
                origin_id: stage.origin_id,
                name: stage.name,
                color: stage.color,
                order_num: stage.order_num,
            };
            let row = diesel::insert_into(pipeline_stages::table)
                .values(&row)
                .returning(StageRow::as_returning())
                .get_result(conn)?;
            Ok(Stage::from(row))
        })
        .await
    }

    async fn delete_stage(&self, id: Uuid, renumbered: &[(Uuid, i32)]) -> StoreResult<bool> {
        let renumbered = renumbered.to_vec();
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let deleted = diesel::delete(pipeline_stages::table.find(id)).execute(conn)?;
                if deleted == 0 {
                    return Ok(false);
                }
                for (stage_id, order_num) in &renumbered {
                    diesel::update(pipeline_stages::table.find(*stage_id))
                        .set(pipeline_stages::order_num.eq(*order_num))
                        .execute(conn)?;
                }
                Ok(true)
            })
        })
        .await
    }

    async fn set_stage_orders(&self, origin_id: Uuid, orders: &[(Uuid, i32)]) -> StoreResult<()> {
        let orders = orders.to_vec();
        self.run(move |conn| {
            // The (origin_id, order_num) constraint is deferred, so swaps only
            // have to be consistent at commit.
            conn.transaction::<_, StoreError, _>(|conn| {
                for (stage_id, order_num) in &orders {
                    let updated = diesel::update(
                        pipeline_stages::table
                            .filter(pipeline_stages::id.eq(*stage_id))
                            .filter(pipeline_stages::origin_id.eq(origin_id)),
                    )
                    .set(pipeline_stages::order_num.eq(*order_num))
                    .execute(conn)?;
                    if updated == 0 {
                        return Err(StoreError::MissingReference("stage".into()));
                    }
                }
                Ok(())
            })
        })
        .await
    }

    async fn get_membership(
        &self,
        origin_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<OriginMembership>> {
        self.run(move |conn| {
            origin_members::table
                .find((origin_id, user_id))
                .select(MembershipRow::as_select())
                .first(conn)
                .optional()?
                .map(OriginMembership::try_from)
                .transpose()
        })
        .await
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OriginMembership>> {
        self.run(move |conn| {
            let rows = origin_members::table
                .filter(origin_members::user_id.eq(user_id))
                .select(MembershipRow::as_select())
                .load(conn)?;
            rows.into_iter().map(OriginMembership::try_from).collect()
        })
        .await
    }

    async fn list_members(&self, origin_id: Uuid) -> StoreResult<Vec<OriginMembership>> {
        self.run(move |conn| {
            let rows = origin_members::table
                .filter(origin_members::origin_id.eq(origin_id))
                .select(MembershipRow::as_select())
                .load(conn)?;
            rows.into_iter().map(OriginMembership::try_from).collect()
        })
        .await
    }

    async fn upsert_membership(
        &self,
        membership: OriginMembership,
    ) -> StoreResult<OriginMembership> {
        self.run(move |conn| {
            let row = MembershipRow {
                origin_id: membership.origin_id,
                user_id: membership.user_id,
                role: membership.role.as_str().to_string(),
            };
            diesel::insert_into(origin_members::table)
                .values(&row)
                .on_conflict((origin_members::origin_id, origin_members::user_id))
                .do_update()
                .set(origin_members::role.eq(excluded(origin_members::role)))
                .execute(conn)?;
            Ok(membership)
        })
        .await
    }

    async fn delete_membership(&self, origin_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            let deleted =
                diesel::delete(origin_members::table.find((origin_id, user_id))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn placement_exists(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            Ok(diesel::select(diesel::dsl::exists(
                contact_origins::table.find((contact_id, origin_id)),
            ))
            .get_result::<bool>(conn)?)
        })
        .await
    }

    async fn insert_placement(&self, placement: ContactOrigin) -> StoreResult<()> {
        self.run(move |conn| {
            diesel::insert_into(contact_origins::table)
                .values((
                    contact_origins::contact_id.eq(placement.contact_id),
                    contact_origins::origin_id.eq(placement.origin_id),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn remove_placement(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let removed =
                    diesel::delete(contact_origins::table.find((contact_id, origin_id)))
                        .execute(conn)?;
                let origin_stages = pipeline_stages::table
                    .filter(pipeline_stages::origin_id.eq(origin_id))
                    .select(pipeline_stages::id.nullable());
                diesel::update(
                    contacts::table
                        .filter(contacts::id.eq(contact_id))
                        .filter(contacts::stage_id.eq_any(origin_stages)),
                )
                .set(contacts::stage_id.eq(None::<Uuid>))
                .execute(conn)?;
                Ok(removed > 0)
            })
        })
        .await
    }

    async fn contacts_in_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Contact>> {
        self.run(move |conn| {
            let rows = contact_origins::table
                .inner_join(contacts::table)
                .filter(contact_origins::origin_id.eq(origin_id))
                .select(ContactRow::as_select())
                .order(contacts::created_at.desc())
                .load(conn)?;
            Ok(rows.into_iter().map(Contact::from).collect())
        })
        .await
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        self.run(move |conn| {
            let rows = tags::table
                .select(TagRow::as_select())
                .order(tags::name.asc())
                .load(conn)?;
            Ok(rows.into_iter().map(Tag::from).collect())
        })
        .await
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>> {
        self.run(move |conn| {
            Ok(tags::table
                .find(id)
                .select(TagRow::as_select())
                .first(conn)
                .optional()?
                .map(Tag::from))
        })
        .await
    }

    async fn insert_tag(&self, tag: Tag) -> StoreResult<Tag> {
        self.run(move |conn| {
            let row = TagRow {
                id: tag.id,
                name: tag.name,
                created_by: tag.created_by,
                created_at: tag.created_at,
            };
            let row = diesel::insert_into(tags::table)
                .values(&row)
                .returning(TagRow::as_returning())
                .get_result(conn)?;
            Ok(Tag::from(row))
        })
        .await
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        self.run(move |conn| {
            let deleted = diesel::delete(tags::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn tag_contact(&self, contact_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        self.run(move |conn| {
            diesel::insert_into(contact_tags::table)
                .values((
                    contact_tags::contact_id.eq(contact_id),
                    contact_tags::tag_id.eq(tag_id),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn contact_tags(&self, contact_id: Uuid) -> StoreResult<Vec<Tag>> {
        self.run(move |conn| {
            let rows = contact_tags::table
                .inner_join(tags::table)
                .filter(contact_tags::contact_id.eq(contact_id))
                .select(TagRow::as_select())
                .order(tags::name.asc())
                .load(conn)?;
            Ok(rows.into_iter().map(Tag::from).collect())
        })
        .await
    }
}
