use chrono::{NaiveDate, TimeZone, Utc};
use donation_etl::contract::{Store, Table, TableRows};
use donation_etl::load::load;
use donation_etl::model::{CampaignStats, ProcessedDonation};
use donation_etl::store::SqliteStore;
use donation_etl::PipelineError;
use rusqlite::Connection;
use tempfile::tempdir;

fn donation(donor_id: i64, amount: f64, campaign_id: i64, minute: u32) -> ProcessedDonation {
    ProcessedDonation {
        donor_id,
        amount,
        campaign_id,
        timestamp: NaiveDate::from_ymd_opt(2025, 5, 3)
            .and_then(|d| d.and_hms_opt(10, minute, 0))
            .unwrap(),
        processed_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn stat(campaign_id: i64, total_amount: f64, donation_count: i64) -> CampaignStats {
    CampaignStats { campaign_id, total_amount, donation_count }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

fn stats_rows(conn: &Connection) -> Vec<(i64, f64, i64)> {
    let mut stmt = conn
        .prepare("SELECT campaign_id, total_amount, donation_count FROM stats ORDER BY campaign_id")
        .unwrap();
    stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[tokio::test]
async fn load_appends_donations_and_replaces_stats_across_runs() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    let store = SqliteStore::new(&db);

    let first = vec![donation(1, 50.0, 101, 0), donation(2, 100.0, 102, 1)];
    load(&store, &first, &[stat(101, 50.0, 1), stat(102, 100.0, 1)])
        .await
        .expect("first load");

    let second = vec![donation(3, 10.0, 103, 2)];
    load(&store, &second, &[stat(103, 10.0, 1)])
        .await
        .expect("second load");

    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "donations"), 3, "donations accumulate");
    assert_eq!(stats_rows(&conn), vec![(103, 10.0, 1)], "stats are replaced");
}

#[tokio::test]
async fn stored_timestamps_are_iso_text() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    let store = SqliteStore::new(&db);

    store.append(TableRows::Donations(&[donation(1, 1.0, 1, 5)])).await.unwrap();

    let conn = Connection::open(&db).unwrap();
    let (ts, processed): (String, String) = conn
        .query_row("SELECT timestamp, processed_at FROM donations", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(ts, "2025-05-03T10:05:00");
    assert_eq!(processed, "2026-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn replace_with_same_snapshot_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    let store = SqliteStore::new(&db);
    let snapshot = vec![stat(101, 125.0, 2), stat(102, 100.0, 1)];

    store.replace(TableRows::Stats(&snapshot)).await.unwrap();
    store.replace(TableRows::Stats(&snapshot)).await.unwrap();

    let conn = Connection::open(&db).unwrap();
    assert_eq!(stats_rows(&conn), vec![(101, 125.0, 2), (102, 100.0, 1)]);
}

#[tokio::test]
async fn append_to_stats_does_not_clear() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    let store = SqliteStore::new(&db);

    assert_eq!(store.append(TableRows::Stats(&[stat(1, 1.0, 1)])).await.unwrap(), 1);
    assert_eq!(store.append(TableRows::Stats(&[stat(2, 2.0, 1)])).await.unwrap(), 1);

    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "stats"), 2);
}

#[tokio::test]
async fn appending_no_rows_writes_nothing() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    let store = SqliteStore::new(&db);
    let rows = TableRows::Donations(&[]);

    assert!(rows.is_empty());
    assert_eq!(rows.table(), Table::Donations);
    assert_eq!(store.append(rows).await.unwrap(), 0);

    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "donations"), 0);
}

#[tokio::test]
async fn failed_write_run_leaves_both_tables_untouched() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("donations.db");
    {
        // A stats table with a constraint the next snapshot violates.
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE stats (
                campaign_id INTEGER NOT NULL CHECK (campaign_id > 0),
                total_amount REAL NOT NULL,
                donation_count INTEGER NOT NULL
            );
            INSERT INTO stats VALUES (1, 10.0, 1);",
        )
        .unwrap();
    }
    let store = SqliteStore::new(&db);

    let err = store
        .write_run(&[donation(1, 5.0, -1, 0)], &[stat(-1, 5.0, 1)])
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Storage(_)), "got {err:?}");
    let conn = Connection::open(&db).unwrap();
    assert_eq!(count(&conn, "donations"), 0, "donation insert rolled back");
    assert_eq!(stats_rows(&conn), vec![(1, 10.0, 1)], "old snapshot kept");
}

#[tokio::test]
async fn unopenable_database_is_storage_error() {
    let dir = tempdir().unwrap();
    // A directory cannot be opened as a database file.
    let store = SqliteStore::new(dir.path());

    let err = store.write_run(&[donation(1, 1.0, 1, 0)], &[]).await.unwrap_err();

    assert!(matches!(err, PipelineError::Storage(_)), "got {err:?}");
    assert_eq!(store.backend(), "sqlite");
}
