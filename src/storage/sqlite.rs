use crate::model::{BatchMeta, CanonicalListing, Platform, StorageError};
use chrono::NaiveDate;
use rusqlite::{Connection, params};

pub struct SqliteStorage {
    conn: Connection,
}

/// One persisted row of the `products` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredListing {
    pub title: String,
    pub price: u32,
    pub platform: String,
    pub scrape_date: NaiveDate,
    pub city: String,
    pub pincode: String,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                price INTEGER NOT NULL,
                platform TEXT NOT NULL,
                scrape_date TEXT NOT NULL,
                city TEXT NOT NULL,
                pincode TEXT NOT NULL,
                UNIQUE (title, platform, scrape_date, city, pincode)
            );

            CREATE INDEX IF NOT EXISTS idx_products_platform_date
                ON products (platform, scrape_date);
            ",
        )?;

        Ok(Self { conn })
    }

    /// Stores a normalized batch. Rows already present for the same
    /// title/platform/date/location are left untouched; returns how many rows were new.
    pub fn save_listings(
        &mut self,
        listings: &[CanonicalListing],
        meta: &BatchMeta,
    ) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO products (title, price, platform, scrape_date, city, pincode)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for listing in listings {
                inserted += stmt.execute(params![
                    &listing.title,
                    listing.price,
                    meta.platform.name(),
                    meta.scrape_date,
                    &meta.city,
                    &meta.pincode,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Rows for one platform, day and location, cheapest first.
    pub fn listings_for(
        &self,
        platform: Platform,
        date: NaiveDate,
        city: &str,
        pincode: &str,
    ) -> Result<Vec<StoredListing>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, price, platform, scrape_date, city, pincode
             FROM products
             WHERE platform = ?1 AND scrape_date = ?2 AND city = ?3 AND pincode = ?4
             ORDER BY price ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![platform.name(), date, city, pincode], |row| {
            Ok(StoredListing {
                title: row.get(0)?,
                price: row.get(1)?,
                platform: row.get(2)?,
                scrape_date: row.get(3)?,
                city: row.get(4)?,
                pincode: row.get(5)?,
            })
        })?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
