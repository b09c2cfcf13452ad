use futures_core::future::BoxFuture;
use serde_json::Value;
use sqlx::{
    error::BoxDynError,
    migrate::{Migration as SqlxMigration, MigrationSource, MigrationType, Migrator},
    pool::PoolOptions,
    sqlite::{Sqlite, SqliteConnectOptions, SqliteRow},
    types::Json,
    ConnectOptions, Pool, Row,
};
use std::path::Path;

use crate::{
    error::DocrefError,
    properties::{
        Actor, ItemFields, ItemId, ItemKey, MetaKey, NewTerm, StoredItem, Taxonomy, TermId,
        TermRef,
    },
    store::DocStore,
};

/// A [`DocStore`] backed by a SQLite database file.
///
/// Parents are stored as `0` for "none" so the (kind, slug, parent) and (taxonomy, slug, parent)
/// unique constraints also hold for top-level rows. Every trait call is a single statement or a
/// short transaction of its own.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    actor: Option<Actor>,
}

impl SqliteStore {
    /// Open (creating and migrating if needed) the database at `path`.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<SqliteStore, DocrefError> {
        Ok(SqliteStore {
            pool: db_init(path.as_ref()).await?,
            actor: None,
        })
    }

    pub fn with_actor(mut self, actor: Actor) -> SqliteStore {
        self.actor = Some(actor);
        self
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn item_count(&self) -> Result<i64, DocrefError> {
        let row = sqlx::query("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    pub async fn meta(&self, id: ItemId, key: MetaKey) -> Result<Option<Value>, DocrefError> {
        let row = sqlx::query("SELECT value FROM item_meta WHERE item = ? AND key = ?")
            .bind(id.0)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let Json(value) = row.try_get::<Json<Value>, _>("value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

fn item_column(id: Option<ItemId>) -> i64 {
    id.map_or(0, |id| id.0)
}

fn term_column(id: Option<TermId>) -> i64 {
    id.map_or(0, |id| id.0)
}

fn item_from_row(row: &SqliteRow) -> Result<StoredItem, DocrefError> {
    let parent: i64 = row.try_get("parent")?;
    Ok(StoredItem {
        id: ItemId(row.try_get("id")?),
        fields: ItemFields {
            kind: row.try_get::<String, _>("kind")?.parse()?,
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            excerpt: row.try_get("excerpt")?,
            content: row.try_get("content")?,
            parent: (parent != 0).then_some(ItemId(parent)),
            status: row.try_get::<String, _>("status")?.parse()?,
        },
    })
}

fn term_from_row(row: &SqliteRow) -> Result<TermRef, DocrefError> {
    let parent: i64 = row.try_get("parent")?;
    Ok(TermRef {
        id: TermId(row.try_get("id")?),
        taxonomy: row.try_get::<String, _>("taxonomy")?.parse()?,
        label: row.try_get("label")?,
        slug: row.try_get("slug")?,
        parent: (parent != 0).then_some(TermId(parent)),
    })
}

impl DocStore for SqliteStore {
    async fn current_actor(&self) -> Result<Option<Actor>, DocrefError> {
        Ok(self.actor.clone())
    }

    async fn find_item(&self, key: &ItemKey) -> Result<Option<StoredItem>, DocrefError> {
        let row = sqlx::query("SELECT * FROM items WHERE kind = ? AND slug = ? AND parent = ?")
            .bind(key.kind.as_str())
            .bind(&key.slug)
            .bind(item_column(key.parent))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn create_item(&self, fields: &ItemFields) -> Result<ItemId, DocrefError> {
        let result = sqlx::query(
            "INSERT INTO items (kind, slug, parent, title, excerpt, content, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.kind.as_str())
        .bind(&fields.slug)
        .bind(item_column(fields.parent))
        .bind(&fields.title)
        .bind(&fields.excerpt)
        .bind(&fields.content)
        .bind(fields.status.as_str())
        .execute(&self.pool)
        .await?;
        let id = ItemId(result.last_insert_rowid());
        tracing::debug!("[SqliteStore] inserted {} '{}' as {id}", fields.kind, fields.slug);
        Ok(id)
    }

    async fn update_item(&self, id: ItemId, fields: &ItemFields) -> Result<ItemId, DocrefError> {
        let result = sqlx::query(
            "UPDATE items SET kind = ?, slug = ?, parent = ?, title = ?, excerpt = ?, \
             content = ?, status = ? WHERE id = ?",
        )
        .bind(fields.kind.as_str())
        .bind(&fields.slug)
        .bind(item_column(fields.parent))
        .bind(&fields.title)
        .bind(&fields.excerpt)
        .bind(&fields.content)
        .bind(fields.status.as_str())
        .bind(id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DocrefError::NotFound(format!("item {id}")));
        }
        Ok(id)
    }

    async fn set_item_meta(
        &self,
        id: ItemId,
        key: MetaKey,
        value: &Value,
    ) -> Result<(), DocrefError> {
        sqlx::query("INSERT OR REPLACE INTO item_meta (item, key, value) VALUES (?, ?, ?)")
            .bind(id.0)
            .bind(key.as_str())
            .bind(Json(value))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_term(
        &self,
        taxonomy: Taxonomy,
        slug: &str,
        parent: Option<TermId>,
    ) -> Result<Option<TermRef>, DocrefError> {
        let row = sqlx::query("SELECT * FROM terms WHERE taxonomy = ? AND slug = ? AND parent = ?")
            .bind(taxonomy.as_str())
            .bind(slug)
            .bind(term_column(parent))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(term_from_row).transpose()
    }

    async fn create_term(&self, term: &NewTerm) -> Result<TermRef, DocrefError> {
        let mut tx = self.pool.begin().await?;
        if let Some(parent) = term.parent {
            let parent_taxonomy: Option<String> =
                sqlx::query("SELECT taxonomy FROM terms WHERE id = ?")
                    .bind(parent.0)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|row| row.try_get("taxonomy"))
                    .transpose()?;
            if parent_taxonomy.as_deref() != Some(term.taxonomy.as_str()) {
                return Err(DocrefError::Store(format!(
                    "parent term {parent} is not a {} term",
                    term.taxonomy
                )));
            }
        }
        let result =
            sqlx::query("INSERT INTO terms (taxonomy, label, slug, parent) VALUES (?, ?, ?, ?)")
                .bind(term.taxonomy.as_str())
                .bind(&term.label)
                .bind(&term.slug)
                .bind(term_column(term.parent))
                .execute(&mut *tx)
                .await?;
        tx.commit().await?;

        let created = TermRef {
            id: TermId(result.last_insert_rowid()),
            taxonomy: term.taxonomy,
            label: term.label.clone(),
            slug: term.slug.clone(),
            parent: term.parent,
        };
        tracing::debug!(
            "[SqliteStore] created {} term '{}' ({})",
            created.taxonomy,
            created.label,
            created.id
        );
        Ok(created)
    }

    async fn attach_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
        terms: &[TermId],
    ) -> Result<(), DocrefError> {
        let mut tx = self.pool.begin().await?;
        for term in terms {
            let found: Option<String> = sqlx::query("SELECT taxonomy FROM terms WHERE id = ?")
                .bind(term.0)
                .fetch_optional(&mut *tx)
                .await?
                .map(|row| row.try_get("taxonomy"))
                .transpose()?;
            if found.as_deref() != Some(taxonomy.as_str()) {
                return Err(DocrefError::Store(format!(
                    "term {term} is not a {taxonomy} term"
                )));
            }
        }
        sqlx::query("DELETE FROM item_terms WHERE item = ? AND taxonomy = ?")
            .bind(item.0)
            .bind(taxonomy.as_str())
            .execute(&mut *tx)
            .await?;
        for term in terms {
            sqlx::query("INSERT OR IGNORE INTO item_terms (item, taxonomy, term) VALUES (?, ?, ?)")
                .bind(item.0)
                .bind(taxonomy.as_str())
                .bind(term.0)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn item_terms(
        &self,
        item: ItemId,
        taxonomy: Taxonomy,
    ) -> Result<Vec<TermRef>, DocrefError> {
        let rows = sqlx::query(
            "SELECT terms.* FROM item_terms JOIN terms ON terms.id = item_terms.term \
             WHERE item_terms.item = ? AND item_terms.taxonomy = ? ORDER BY terms.id",
        )
        .bind(item.0)
        .bind(taxonomy.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(term_from_row).collect()
    }
}

/// A migration definition.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
    pub kind: MigrationType,
}

#[derive(Debug, Clone)]
struct MigrationList(Vec<Migration>);

impl MigrationSource<'static> for MigrationList {
    fn resolve(self) -> BoxFuture<'static, Result<Vec<SqlxMigration>, BoxDynError>> {
        Box::pin(async move {
            let mut migrations = Vec::new();
            for migration in self.0 {
                if matches!(migration.kind, MigrationType::ReversibleUp) {
                    migrations.push(SqlxMigration::new(
                        migration.version,
                        migration.description.into(),
                        migration.kind,
                        migration.sql.into(),
                        false,
                    ));
                }
            }
            Ok(migrations)
        })
    }
}

pub async fn db_init(db_path: &Path) -> Result<Pool<Sqlite>, sqlx::Error> {
    tracing::debug!("Initializing reference db from file: {:?}", db_path);
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(false)
        .foreign_keys(true)
        .disable_statement_logging()
        .create_if_missing(true);
    let pool = PoolOptions::<Sqlite>::new().connect_with(options).await?;

    let migrations = MigrationList(vec![Migration {
        version: 1,
        description: "create_reference_tables",
        sql: "\
        CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, kind TEXT NOT NULL, slug TEXT NOT NULL, parent INTEGER NOT NULL DEFAULT 0, title TEXT NOT NULL, excerpt TEXT NOT NULL, content TEXT NOT NULL, status TEXT NOT NULL, UNIQUE(kind, slug, parent)); \
        CREATE TABLE item_meta (item INTEGER NOT NULL REFERENCES items(id), key TEXT NOT NULL, value TEXT NOT NULL, PRIMARY KEY(item, key)); \
        CREATE TABLE terms (id INTEGER PRIMARY KEY AUTOINCREMENT, taxonomy TEXT NOT NULL, label TEXT NOT NULL, slug TEXT NOT NULL, parent INTEGER NOT NULL DEFAULT 0, UNIQUE(taxonomy, slug, parent)); \
        CREATE TABLE item_terms (item INTEGER NOT NULL REFERENCES items(id), taxonomy TEXT NOT NULL, term INTEGER NOT NULL REFERENCES terms(id), UNIQUE(item, term));",
        kind: MigrationType::ReversibleUp,
    }]);
    let migrator = Migrator::new(migrations).await?;
    migrator.run(&pool).await?;

    let items = sqlx::query("SELECT COUNT(*) FROM items")
        .fetch_one(&pool)
        .await?;
    let terms = sqlx::query("SELECT COUNT(*) FROM terms")
        .fetch_one(&pool)
        .await?;
    tracing::info!(
        "DB Connection initialized.\n \
         \tStored item count:\t{:?} \n \
         \tStored term count:\t{:?}",
        items.get::<i64, usize>(0),
        terms.get::<i64, usize>(0)
    );

    Ok(pool)
}
