//! sea-orm backed store: sqlite, postgres or mysql inferred from the URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Schema,
};
use tracing::{debug, info, warn};

use super::entities::{click_event, link};
use super::models::Link;
use super::{ClickStore, LinkFilter, LinkStore, StoredClickEvent};
use crate::analytics::{ClickEvent, ClickSink};
use crate::errors::{Result, SnaplinkError};

pub struct SqlStore {
    db: DatabaseConnection,
    backend: DbBackend,
}

impl SqlStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .max_connections((num_cpus::get() * 4) as u32)
            .min_connections(2)
            .connect_timeout(std::time::Duration::from_secs(10))
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .map_err(|e| SnaplinkError::store_unavailable(format!("connect failed: {}", e)))?;
        let backend = db.get_database_backend();

        let store = Self { db, backend };
        store.init_schema().await?;

        info!("SqlStore connected: {:?}", store.backend);
        Ok(store)
    }

    /// 从实体定义建表，幂等
    async fn init_schema(&self) -> Result<()> {
        let schema = Schema::new(self.backend);

        let mut links_table = schema.create_table_from_entity(link::Entity);
        links_table.if_not_exists();
        self.db.execute(self.backend.build(&links_table)).await?;

        let mut clicks_table = schema.create_table_from_entity(click_event::Entity);
        clicks_table.if_not_exists();
        self.db.execute(self.backend.build(&clicks_table)).await?;

        debug!("Schema initialized");
        Ok(())
    }

    fn model_to_link(model: link::Model) -> Link {
        Link {
            code: model.code,
            destination: model.destination,
            owner_id: model.owner_id,
            created_at: model.created_at,
            expires_at: model.expires_at,
            disabled: model.disabled,
        }
    }

    fn link_to_active(link: Link) -> link::ActiveModel {
        link::ActiveModel {
            code: Set(link.code),
            destination: Set(link.destination),
            owner_id: Set(link.owner_id),
            created_at: Set(link.created_at),
            expires_at: Set(link.expires_at),
            disabled: Set(link.disabled),
        }
    }

    fn event_to_active(event: ClickEvent) -> click_event::ActiveModel {
        click_event::ActiveModel {
            id: NotSet,
            code: Set(event.code),
            timestamp: Set(event.timestamp),
            referrer: Set(event.referrer),
            user_agent_class: Set(event.user_agent_class.as_ref().to_string()),
        }
    }

    fn model_to_stored_event(model: click_event::Model) -> StoredClickEvent {
        StoredClickEvent {
            id: model.id,
            event: ClickEvent {
                code: model.code,
                timestamp: model.timestamp,
                referrer: model.referrer,
                user_agent_class: model
                    .user_agent_class
                    .parse()
                    .unwrap_or(crate::analytics::UserAgentClass::Other),
            },
        }
    }
}

#[async_trait]
impl LinkStore for SqlStore {
    async fn insert_if_absent(&self, link: Link) -> Result<()> {
        let code = link.code.clone();

        // 唯一性由主键约束保证；冲突时 DO NOTHING，受影响行数为 0
        let inserted = link::Entity::insert(Self::link_to_active(link))
            .on_conflict(
                OnConflict::column(link::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            return Err(SnaplinkError::already_exists(code));
        }
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<Link>> {
        let model = link::Entity::find_by_id(code.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(Self::model_to_link))
    }

    async fn disable(&self, code: &str) -> Result<()> {
        // 两步而不是依赖受影响行数：MySQL 对无变化的 UPDATE 返回 0，
        // 会把重复 disable 误判成 NotFound
        if self.get(code).await?.is_none() {
            return Err(SnaplinkError::not_found(code));
        }

        link::Entity::update_many()
            .col_expr(link::Column::Disabled, Expr::value(true))
            .filter(link::Column::Code.eq(code))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn set_expiry(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        if self.get(code).await?.is_none() {
            return Err(SnaplinkError::not_found(code));
        }

        link::Entity::update_many()
            .col_expr(link::Column::ExpiresAt, Expr::value(expires_at))
            .filter(link::Column::Code.eq(code))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        filter: LinkFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Link>, u64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);

        let mut query = link::Entity::find().order_by_desc(link::Column::CreatedAt);
        if let Some(owner) = filter.owner_id {
            query = query.filter(link::Column::OwnerId.eq(owner));
        }
        if !filter.include_disabled {
            query = query.filter(link::Column::Disabled.eq(false));
        }

        let paginator = query.paginate(&self.db, page_size);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page - 1).await?;

        Ok((models.into_iter().map(Self::model_to_link).collect(), total))
    }

    async fn count(&self) -> Result<u64> {
        Ok(link::Entity::find().count(&self.db).await?)
    }

    fn backend_name(&self) -> &'static str {
        match self.backend {
            DbBackend::Sqlite => "sqlite",
            DbBackend::Postgres => "postgres",
            DbBackend::MySql => "mysql",
        }
    }
}

#[async_trait]
impl ClickSink for SqlStore {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let count = events.len();
        let models: Vec<click_event::ActiveModel> =
            events.into_iter().map(Self::event_to_active).collect();

        click_event::Entity::insert_many(models)
            .exec_without_returning(&self.db)
            .await?;

        debug!("SqlStore: flushed {} click events", count);
        Ok(())
    }
}

#[async_trait]
impl ClickStore for SqlStore {
    async fn events_after(&self, cursor: i64, limit: u64) -> Result<Vec<StoredClickEvent>> {
        let models = click_event::Entity::find()
            .filter(click_event::Column::Id.gt(cursor))
            .order_by_asc(click_event::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Self::model_to_stored_event).collect())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = click_event::Entity::delete_many()
            .filter(click_event::Column::Timestamp.lt(cutoff))
            .exec(&self.db)
            .await?;
        if res.rows_affected > 0 {
            warn!(
                "SqlStore: pruned {} click events older than {}",
                res.rows_affected, cutoff
            );
        }
        Ok(res.rows_affected)
    }
}
