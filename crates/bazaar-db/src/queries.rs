use crate::Database;
use crate::models::{ConversationRow, NewProduct, PrincipalRow, ProductRow};
use anyhow::Result;
use bazaar_types::models::Role;
use rusqlite::{Connection, Row};

const PRODUCT_COLUMNS: &str = "p.id, p.seller_id, s.email, p.name, p.description, p.price, p.image_url, p.created_at";

const CONVERSATION_COLUMNS: &str = "id, product_id, seller_id, buyer_id, created_at";

/// Buyers and sellers share a shape but live in separate tables.
fn principal_table(role: Role) -> &'static str {
    match role {
        Role::Buyer => "buyers",
        Role::Seller => "sellers",
    }
}

impl Database {
    // -- Accounts --

    /// Insert a new account. Returns `false` without writing anything if the
    /// email is already registered for this role.
    pub fn create_principal(
        &self,
        role: Role,
        id: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {} (id, email, password) VALUES (?1, ?2, ?3) ON CONFLICT(email) DO NOTHING",
            principal_table(role)
        );
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(&sql, (id, email, password_hash))?;
            Ok(inserted == 1)
        })
    }

    pub fn get_principal_by_email(&self, role: Role, email: &str) -> Result<Option<PrincipalRow>> {
        self.with_conn(|conn| query_principal(conn, role, email))
    }

    // -- Products --

    pub fn insert_product(&self, product: &NewProduct<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO products (id, seller_id, name, description, price, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    product.id,
                    product.seller_id,
                    product.name,
                    product.description,
                    product.price,
                    product.image_url,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_products(&self) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products p JOIN sellers s ON p.seller_id = s.id
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products p JOIN sellers s ON p.seller_id = s.id
                 WHERE p.id = ?1"
            );
            conn.query_row(&sql, [id], product_from_row).optional()
        })
    }

    pub fn list_products_by_seller(&self, seller_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products p JOIN sellers s ON p.seller_id = s.id
                 WHERE p.seller_id = ?1
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([seller_id], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fetch a product only if it belongs to `seller_id`.
    pub fn get_product_for_seller(&self, seller_id: &str, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {PRODUCT_COLUMNS}
                 FROM products p JOIN sellers s ON p.seller_id = s.id
                 WHERE p.id = ?1 AND p.seller_id = ?2"
            );
            conn.query_row(&sql, [id, seller_id], product_from_row).optional()
        })
    }

    // -- Conversations --

    /// Atomic find-or-create for the (product, seller, buyer) triple.
    ///
    /// `candidate_id` is stored only when no conversation exists yet for the
    /// triple. Returns the id actually stored and whether this call created it.
    /// The UNIQUE constraint on the triple means racing callers always converge
    /// on a single row.
    pub fn find_or_create_conversation(
        &self,
        candidate_id: &str,
        product_id: &str,
        seller_id: &str,
        buyer_id: &str,
    ) -> Result<(String, bool)> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let inserted = tx.execute(
                "INSERT INTO conversations (id, product_id, seller_id, buyer_id)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(product_id, seller_id, buyer_id) DO NOTHING",
                (candidate_id, product_id, seller_id, buyer_id),
            )?;

            let id: String = tx.query_row(
                "SELECT id FROM conversations
                 WHERE product_id = ?1 AND seller_id = ?2 AND buyer_id = ?3",
                (product_id, seller_id, buyer_id),
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok((id, inserted == 1))
        })
    }

    /// Conversations on one product, restricted to those owned by `seller_id`.
    pub fn list_conversations_for_product(
        &self,
        seller_id: &str,
        product_id: &str,
    ) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE product_id = ?1 AND seller_id = ?2
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([product_id, seller_id], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_conversations_for_buyer(&self, buyer_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE buyer_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([buyer_id], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_principal(conn: &Connection, role: Role, email: &str) -> Result<Option<PrincipalRow>> {
    let sql = format!(
        "SELECT id, email, password FROM {} WHERE email = ?1",
        principal_table(role)
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([email], |row| {
        Ok(PrincipalRow {
            id: row.get(0)?,
            email: row.get(1)?,
            password: row.get(2)?,
        })
    })
    .optional()
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        seller_email: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        price: row.get(5)?,
        image_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        seller_id: row.get(2)?,
        buyer_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    struct Fixture {
        db: Arc<Database>,
        seller: String,
        buyer: String,
        product: String,
        _dir: TempDir,
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn open() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("bazaar.db")).unwrap();
        (db, dir)
    }

    fn add_product(db: &Database, seller: &str, name: &str) -> String {
        let id = new_id();
        db.insert_product(&NewProduct {
            id: &id,
            seller_id: seller,
            name,
            description: "",
            price: 25.0,
            image_url: "",
        })
        .unwrap();
        id
    }

    fn fixture() -> Fixture {
        let (db, dir) = open();
        let seller = new_id();
        let buyer = new_id();
        assert!(db.create_principal(Role::Seller, &seller, "s@shop.test", "hash").unwrap());
        assert!(db.create_principal(Role::Buyer, &buyer, "b@shop.test", "hash").unwrap());
        let product = add_product(&db, &seller, "Widget");
        Fixture {
            db: Arc::new(db),
            seller,
            buyer,
            product,
            _dir: dir,
        }
    }

    fn count_conversations(db: &Database) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn duplicate_email_is_rejected_per_role() {
        let (db, _dir) = open();
        assert!(db.create_principal(Role::Buyer, &new_id(), "a@shop.test", "h1").unwrap());
        assert!(!db.create_principal(Role::Buyer, &new_id(), "a@shop.test", "h2").unwrap());

        // Same email is free in the other table.
        assert!(db.create_principal(Role::Seller, &new_id(), "a@shop.test", "h3").unwrap());

        let stored = db.get_principal_by_email(Role::Buyer, "a@shop.test").unwrap().unwrap();
        assert_eq!(stored.password, "h1");
    }

    #[test]
    fn principal_lookup_by_email_respects_role() {
        let (db, _dir) = open();
        db.create_principal(Role::Seller, &new_id(), "s@shop.test", "h").unwrap();

        assert!(db.get_principal_by_email(Role::Seller, "s@shop.test").unwrap().is_some());
        assert!(db.get_principal_by_email(Role::Buyer, "s@shop.test").unwrap().is_none());
    }

    #[test]
    fn product_lookups_are_scoped_to_owner() {
        let f = fixture();
        let other_seller = new_id();
        f.db.create_principal(Role::Seller, &other_seller, "o@shop.test", "h").unwrap();
        let other_product = add_product(&f.db, &other_seller, "Gadget");

        let all = f.db.list_products().unwrap();
        assert_eq!(all.len(), 2);

        let mine = f.db.list_products_by_seller(&f.seller).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, f.product);
        assert_eq!(mine[0].seller_email, "s@shop.test");

        assert!(f.db.get_product_for_seller(&f.seller, &f.product).unwrap().is_some());
        assert!(f.db.get_product_for_seller(&f.seller, &other_product).unwrap().is_none());
        assert!(f.db.get_product("missing").unwrap().is_none());
    }

    #[test]
    fn find_or_create_reuses_existing_conversation() {
        let f = fixture();

        let (first, created) = f
            .db
            .find_or_create_conversation("chan-one", &f.product, &f.seller, &f.buyer)
            .unwrap();
        assert!(created);
        assert_eq!(first, "chan-one");

        let (second, created) = f
            .db
            .find_or_create_conversation("chan-two", &f.product, &f.seller, &f.buyer)
            .unwrap();
        assert!(!created);
        assert_eq!(second, "chan-one");
        assert_eq!(count_conversations(&f.db), 1);
    }

    #[test]
    fn concurrent_find_or_create_yields_one_row() {
        let f = fixture();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let db = f.db.clone();
                let (product, seller, buyer) = (f.product.clone(), f.seller.clone(), f.buyer.clone());
                std::thread::spawn(move || {
                    db.find_or_create_conversation(&format!("chan-{i}"), &product, &seller, &buyer)
                        .unwrap()
                        .0
                })
            })
            .collect();

        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(count_conversations(&f.db), 1);
    }

    #[test]
    fn seller_conversation_listing_filters_on_seller() {
        let f = fixture();
        f.db.find_or_create_conversation("chan-a", &f.product, &f.seller, &f.buyer)
            .unwrap();

        let mine = f.db.list_conversations_for_product(&f.seller, &f.product).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "chan-a");

        let stranger = new_id();
        assert!(
            f.db.list_conversations_for_product(&stranger, &f.product)
                .unwrap()
                .is_empty()
        );

        let buyer_view = f.db.list_conversations_for_buyer(&f.buyer).unwrap();
        assert_eq!(buyer_view.len(), 1);
    }
}
