use sqlx::SqlitePool;

use crate::error::BOOKING_OVERLAP_MARKER;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Cascading spot deletes depend on this
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    let tables = [
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
        r#"CREATE TABLE IF NOT EXISTS spots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            address TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            country TEXT NOT NULL,
            lat REAL NOT NULL CHECK (lat BETWEEN -90 AND 90),
            lng REAL NOT NULL CHECK (lng BETWEEN -180 AND 180),
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            price REAL NOT NULL CHECK (price >= 0),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(owner_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
        r#"CREATE TABLE IF NOT EXISTS spot_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            spot_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            preview INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(spot_id) REFERENCES spots(id) ON DELETE CASCADE
        )"#,
        r#"CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            spot_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            review TEXT NOT NULL,
            stars INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            UNIQUE(spot_id, user_id),
            FOREIGN KEY(spot_id) REFERENCES spots(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
        r#"CREATE TABLE IF NOT EXISTS review_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(review_id) REFERENCES reviews(id) ON DELETE CASCADE
        )"#,
        r#"CREATE TABLE IF NOT EXISTS bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            spot_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            CHECK (start_date < end_date),
            FOREIGN KEY(spot_id) REFERENCES spots(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    ];
    for ddl in tables {
        sqlx::query(ddl).execute(pool).await?;
    }

    // Same inclusive endpoint rule as booking::ranges_conflict, enforced at
    // write time so concurrent requests cannot both pass the read check.
    // Dates are ISO-8601 text, so string comparison orders them correctly.
    let trigger = format!(
        r#"CREATE TRIGGER IF NOT EXISTS bookings_no_overlap
           BEFORE INSERT ON bookings
           WHEN EXISTS (
               SELECT 1 FROM bookings b
               WHERE b.spot_id = NEW.spot_id
                 AND ((NEW.start_date BETWEEN b.start_date AND b.end_date)
                   OR (NEW.end_date BETWEEN b.start_date AND b.end_date))
           )
           BEGIN
               SELECT RAISE(ABORT, '{}');
           END"#,
        BOOKING_OVERLAP_MARKER
    );
    sqlx::query(&trigger).execute(pool).await?;

    let indexes = [
        ("idx_spots_owner", "CREATE INDEX IF NOT EXISTS idx_spots_owner ON spots(owner_id)"),
        ("idx_spots_lat_lng", "CREATE INDEX IF NOT EXISTS idx_spots_lat_lng ON spots(lat, lng)"),
        ("idx_spots_price", "CREATE INDEX IF NOT EXISTS idx_spots_price ON spots(price)"),
        ("idx_spot_images_spot", "CREATE INDEX IF NOT EXISTS idx_spot_images_spot ON spot_images(spot_id, preview)"),
        ("idx_reviews_user", "CREATE INDEX IF NOT EXISTS idx_reviews_user ON reviews(user_id)"),
        ("idx_review_images_review", "CREATE INDEX IF NOT EXISTS idx_review_images_review ON review_images(review_id)"),
        ("idx_bookings_spot_dates", "CREATE INDEX IF NOT EXISTS idx_bookings_spot_dates ON bookings(spot_id, start_date, end_date)"),
        ("idx_bookings_user", "CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) if db_err.message().to_lowercase().contains("already exists") => {
                    tracing::debug!("Index {} already exists, skipping", name);
                }
                _ => tracing::warn!("Failed to create index {}: {}", name, e),
            }
        }
    }

    Ok(())
}
