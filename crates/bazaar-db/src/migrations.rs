use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, products, conversations)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE buyers (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sellers (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE products (
                id          TEXT PRIMARY KEY,
                seller_id   TEXT NOT NULL REFERENCES sellers(id),
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price       REAL NOT NULL CHECK (price >= 0),
                image_url   TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_products_seller ON products(seller_id);

            CREATE TABLE conversations (
                id          TEXT PRIMARY KEY,
                product_id  TEXT NOT NULL REFERENCES products(id),
                seller_id   TEXT NOT NULL REFERENCES sellers(id),
                buyer_id    TEXT NOT NULL REFERENCES buyers(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(product_id, seller_id, buyer_id)
            );

            CREATE INDEX idx_conversations_seller_product
                ON conversations(seller_id, product_id);
            CREATE INDEX idx_conversations_buyer ON conversations(buyer_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
