//! Song and group persistence
//!
//! Writes run inside a transaction so a song never points at a group that
//! was pruned halfway through an update or delete. Write transactions take
//! the SQLite write lock up front (`BEGIN IMMEDIATE`); concurrent writers
//! wait out the connection busy timeout instead of failing with
//! `database is locked`.

use songbook_common::db::{Song, SongDetail, SongFilter, SongUpdate};
use songbook_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};

const SELECT_SONG: &str = r#"
    SELECT s.id, s.song, g.name AS "group", s.text, s.release_date, s.link
    FROM songs s
    INNER JOIN groups g ON s.group_id = g.id
"#;

const FILTER_CLAUSE: &str = "s.song LIKE ? ESCAPE '\\' \
    AND g.name LIKE ? ESCAPE '\\' \
    AND s.text LIKE ? ESCAPE '\\' \
    AND s.release_date LIKE ? ESCAPE '\\' \
    AND s.link LIKE ? ESCAPE '\\'";

/// Song repository backed by SQLite
#[derive(Clone)]
pub struct SongRepository {
    pool: SqlitePool,
}

impl SongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a transaction holding the write lock
    ///
    /// A deferred transaction that reads before writing cannot wait for the
    /// lock once another connection owns it.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// List songs matching `filter`, returning the page and the total match count
    pub async fn list(
        &self,
        filter: &SongFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Song>, i64)> {
        let patterns = like_patterns(filter);

        let sql = format!("{} WHERE {} ORDER BY s.id LIMIT ? OFFSET ?", SELECT_SONG, FILTER_CLAUSE);
        debug!(?patterns, limit, offset, "Executing song list query");

        let mut query = sqlx::query_as::<_, Song>(&sql);
        for pattern in &patterns {
            query = query.bind(pattern);
        }
        let songs = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM songs s INNER JOIN groups g ON s.group_id = g.id WHERE {}",
            FILTER_CLAUSE
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for pattern in &patterns {
            count_query = count_query.bind(pattern);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        Ok((songs, total))
    }

    /// Load one song by id
    pub async fn get(&self, id: i64) -> Result<Option<Song>> {
        let mut conn = self.pool.acquire().await?;
        fetch_song(&mut conn, id).await
    }

    /// Insert a song, creating its group if needed
    pub async fn create(&self, group: &str, song: &str, detail: &SongDetail) -> Result<Song> {
        let mut tx = self.begin_write().await?;

        let group_id = ensure_group(&mut tx, group).await?;

        debug!(group_id, song = %song, "Inserting song");
        let id = sqlx::query(
            "INSERT INTO songs (group_id, song, text, release_date, link) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(song)
        .bind(&detail.text)
        .bind(&detail.release_date)
        .bind(&detail.link)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let created = fetch_song(&mut tx, id)
            .await?
            .ok_or_else(|| songbook_common::Error::Internal(format!("song {} vanished after insert", id)))?;

        tx.commit().await?;

        info!(song_id = id, group = %group, "Song created");
        Ok(created)
    }

    /// Apply a partial update
    ///
    /// Returns `None` when no song has this id. When the group changes the
    /// previous group is removed if nothing else references it.
    pub async fn update(&self, id: i64, update: &SongUpdate) -> Result<Option<Song>> {
        let mut tx = self.begin_write().await?;

        let Some(current_group_id) = song_group_id(&mut tx, id).await? else {
            return Ok(None);
        };

        let new_group_id = match update.group() {
            Some(name) => Some(ensure_group(&mut tx, name).await?),
            None => None,
        };

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE songs SET ");
        let mut assignments = 0;
        {
            let mut set = builder.separated(", ");
            if let Some(song) = update.song() {
                set.push("song = ").push_bind_unseparated(song.to_string());
                assignments += 1;
            }
            if let Some(group_id) = new_group_id {
                set.push("group_id = ").push_bind_unseparated(group_id);
                assignments += 1;
            }
            if let Some(text) = update.text() {
                set.push("text = ").push_bind_unseparated(text.to_string());
                assignments += 1;
            }
            if let Some(release_date) = update.release_date() {
                set.push("release_date = ")
                    .push_bind_unseparated(release_date.to_string());
                assignments += 1;
            }
            if let Some(link) = update.link() {
                set.push("link = ").push_bind_unseparated(link.to_string());
                assignments += 1;
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        if assignments > 0 {
            debug!(song_id = id, sql = builder.sql(), "Executing song update");
            builder.build().execute(&mut *tx).await?;
        }

        if let Some(group_id) = new_group_id {
            if group_id != current_group_id {
                prune_group(&mut tx, current_group_id).await?;
            }
        }

        let updated = fetch_song(&mut tx, id).await?;
        tx.commit().await?;

        info!(song_id = id, fields = assignments, "Song updated");
        Ok(updated)
    }

    /// Delete a song and its group if the group is now empty
    ///
    /// Returns `false` when no song has this id.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.begin_write().await?;

        let Some(group_id) = song_group_id(&mut tx, id).await? else {
            return Ok(false);
        };

        debug!(song_id = id, "Deleting song");
        sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        prune_group(&mut tx, group_id).await?;
        tx.commit().await?;

        info!(song_id = id, "Song deleted");
        Ok(true)
    }
}

/// Build `%value%` LIKE patterns in filter column order
///
/// `%`, `_` and `\` in user input match literally.
fn like_patterns(filter: &SongFilter) -> [String; 5] {
    [
        &filter.song,
        &filter.group,
        &filter.text,
        &filter.release_date,
        &filter.link,
    ]
    .map(|value| format!("%{}%", escape_like(value.as_deref().unwrap_or(""))))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn fetch_song(conn: &mut SqliteConnection, id: i64) -> Result<Option<Song>> {
    let sql = format!("{} WHERE s.id = ?", SELECT_SONG);
    debug!(song_id = id, "Executing song lookup");

    let song = sqlx::query_as::<_, Song>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if song.is_none() {
        info!(song_id = id, "Song not found");
    }
    Ok(song)
}

async fn song_group_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<i64>> {
    let group_id: Option<i64> = sqlx::query_scalar("SELECT group_id FROM songs WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if group_id.is_none() {
        info!(song_id = id, "Song not found");
    }
    Ok(group_id)
}

/// Return the id of the group named `name`, inserting it if missing
///
/// Names match exactly, ignoring ASCII case.
async fn ensure_group(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query("INSERT INTO groups (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    info!(group_id = id, group = %name, "Group created");
    Ok(id)
}

/// Delete the group if no song references it
async fn prune_group(conn: &mut SqliteConnection, group_id: i64) -> Result<()> {
    let removed = sqlx::query(
        "DELETE FROM groups WHERE id = ? AND NOT EXISTS (SELECT 1 FROM songs WHERE group_id = ?)",
    )
    .bind(group_id)
    .bind(group_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if removed > 0 {
        info!(group_id, "Removed group with no remaining songs");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use songbook_common::db::init_memory_database;

    async fn repo() -> SongRepository {
        SongRepository::new(init_memory_database().await.unwrap())
    }

    fn detail(text: &str) -> SongDetail {
        SongDetail {
            release_date: "16.07.2006".to_string(),
            text: text.to_string(),
            link: "https://example.com/song".to_string(),
        }
    }

    async fn group_count(repo: &SongRepository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&repo.pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo().await;

        let created = repo
            .create("Muse", "Supermassive Black Hole", &detail("verse"))
            .await
            .unwrap();
        assert_eq!(created.group, "Muse");
        assert_eq!(created.release_date, "16.07.2006");

        let fetched = repo.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        assert!(repo.get(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_reuses_group_ignoring_case() {
        let repo = repo().await;

        repo.create("Muse", "Uprising", &detail("")).await.unwrap();
        let second = repo.create("MUSE", "Starlight", &detail("")).await.unwrap();

        assert_eq!(group_count(&repo).await, 1);
        // Stored name keeps the first spelling
        assert_eq!(second.group, "Muse");
    }

    #[tokio::test]
    async fn test_group_match_is_exact_not_substring() {
        let repo = repo().await;

        repo.create("Museum", "Exhibit", &detail("")).await.unwrap();
        let song = repo.create("Muse", "Uprising", &detail("")).await.unwrap();

        assert_eq!(song.group, "Muse");
        assert_eq!(group_count(&repo).await, 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let repo = repo().await;
        repo.create("Muse", "Uprising", &detail("They will not force us")).await.unwrap();
        repo.create("Muse", "Starlight", &detail("Far away")).await.unwrap();
        repo.create("Queen", "Bohemian Rhapsody", &detail("Is this the real life")).await.unwrap();

        let (all, total) = repo.list(&SongFilter::default(), 10, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));

        let filter = SongFilter {
            group: Some("mus".to_string()),
            ..Default::default()
        };
        let (muse, total) = repo.list(&filter, 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert!(muse.iter().all(|s| s.group == "Muse"));

        let filter = SongFilter {
            text: Some("REAL LIFE".to_string()),
            ..Default::default()
        };
        let (queen, total) = repo.list(&filter, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(queen[0].song, "Bohemian Rhapsody");
    }

    #[tokio::test]
    async fn test_list_limit_offset() {
        let repo = repo().await;
        for i in 0..5 {
            repo.create("Band", &format!("Song {}", i), &detail("")).await.unwrap();
        }

        let (page, total) = repo.list(&SongFilter::default(), 2, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].song, "Song 2");

        let (page, _) = repo.list(&SongFilter::default(), 2, 10).await.unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_list_wildcards_match_literally() {
        let repo = repo().await;
        repo.create("Band", "100% Pure", &detail("")).await.unwrap();
        repo.create("Band", "1000 Pure", &detail("")).await.unwrap();

        let filter = SongFilter {
            song: Some("100%".to_string()),
            ..Default::default()
        };
        let (songs, total) = repo.list(&filter, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(songs[0].song, "100% Pure");
    }

    #[tokio::test]
    async fn test_update_fields() {
        let repo = repo().await;
        let song = repo.create("Muse", "Uprising", &detail("old")).await.unwrap();

        let update = SongUpdate {
            text: Some("new text".to_string()),
            link: Some(String::new()),
            ..Default::default()
        };
        let updated = repo.update(song.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.text, "new text");
        assert_eq!(updated.link, song.link, "Empty fields leave values unchanged");
        assert_eq!(updated.song, "Uprising");
    }

    #[tokio::test]
    async fn test_update_group_prunes_orphan() {
        let repo = repo().await;
        let song = repo.create("Old Band", "Track", &detail("")).await.unwrap();

        let update = SongUpdate {
            group: Some("New Band".to_string()),
            ..Default::default()
        };
        let updated = repo.update(song.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.group, "New Band");
        assert_eq!(group_count(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_update_group_keeps_shared_group() {
        let repo = repo().await;
        let first = repo.create("Shared", "One", &detail("")).await.unwrap();
        repo.create("Shared", "Two", &detail("")).await.unwrap();

        let update = SongUpdate {
            group: Some("Solo".to_string()),
            ..Default::default()
        };
        repo.update(first.id, &update).await.unwrap();

        assert_eq!(group_count(&repo).await, 2);
    }

    #[tokio::test]
    async fn test_update_without_group_keeps_group() {
        let repo = repo().await;
        let song = repo.create("Only Band", "Track", &detail("")).await.unwrap();

        let update = SongUpdate {
            song: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = repo.update(song.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.group, "Only Band");
        assert_eq!(group_count(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_update_missing_song() {
        let repo = repo().await;
        let update = SongUpdate {
            song: Some("x".to_string()),
            ..Default::default()
        };
        assert!(repo.update(42, &update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_prunes_group() {
        let repo = repo().await;
        let a = repo.create("Band", "A", &detail("")).await.unwrap();
        let b = repo.create("Band", "B", &detail("")).await.unwrap();

        assert!(repo.delete(a.id).await.unwrap());
        assert_eq!(group_count(&repo).await, 1);

        assert!(repo.delete(b.id).await.unwrap());
        assert_eq!(group_count(&repo).await, 0);

        assert!(!repo.delete(b.id).await.unwrap());
    }
}
