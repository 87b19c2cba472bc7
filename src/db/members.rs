use chrono::Utc;
use rusqlite::{params, Row};

use super::{DbError, DbMember, MemberDb};

impl MemberDb {
    // =========================================================================
    // Members
    // =========================================================================

    const MEMBER_COLUMNS: &'static str = "uid, guid, account_uid, location_uid, is_primary, \
         joined_date_utc, cancel_date_utc, first_name, last_name, \
         address, city, locale, postal_code, cancelled, created_utc, updated_utc";

    /// Insert a member row. Returns the assigned internal uid.
    pub fn insert_member(&self, member: &DbMember) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO member (
                guid, account_uid, location_uid, is_primary, joined_date_utc,
                cancel_date_utc, first_name, last_name, address, city, locale,
                postal_code, cancelled, created_utc, updated_utc
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                member.guid,
                member.account_uid,
                member.location_uid,
                member.is_primary as i32,
                member.joined_date_utc,
                member.cancel_date_utc,
                member.first_name,
                member.last_name,
                member.address,
                member.city,
                member.locale,
                member.postal_code,
                member.cancelled as i32,
                member.created_utc,
                member.updated_utc,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up a member by its public guid.
    pub fn get_member(&self, guid: &str) -> Result<Option<DbMember>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM member WHERE guid = ?1",
            Self::MEMBER_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![guid], Self::map_member_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List an account's members: primary first, then by creation order.
    pub fn get_members_for_account(&self, account_uid: i64) -> Result<Vec<DbMember>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM member
             WHERE account_uid = ?1
             ORDER BY is_primary DESC, created_utc ASC, uid ASC",
            Self::MEMBER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![account_uid], Self::map_member_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Count all members of an account.
    pub fn count_members(&self, account_uid: i64) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM member WHERE account_uid = ?1",
            params![account_uid],
            |row| row.get(0),
        )?)
    }

    /// Count the primary members of an account. Exactly one is the steady
    /// state; zero or many indicates an in-flight mutation or a defect.
    pub fn count_primary_members(&self, account_uid: i64) -> Result<i64, DbError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM member WHERE account_uid = ?1 AND is_primary = 1",
            params![account_uid],
            |row| row.get(0),
        )?)
    }

    /// Select the promotion successor for an account: the remaining member
    /// with the earliest creation timestamp, excluding the member being
    /// deleted. Ties on `created_utc` break on lowest uid so the choice is
    /// deterministic even when timestamps collide.
    pub fn find_successor(
        &self,
        account_uid: i64,
        excluding_uid: i64,
    ) -> Result<Option<DbMember>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM member
             WHERE account_uid = ?1 AND uid != ?2
             ORDER BY created_utc ASC, uid ASC
             LIMIT 1",
            Self::MEMBER_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![account_uid, excluding_uid], Self::map_member_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Flip a member's primary flag on. Returns true if a row was updated.
    pub fn set_primary(&self, uid: i64) -> Result<bool, DbError> {
        let rows = self.conn.execute(
            "UPDATE member SET is_primary = 1, updated_utc = ?1 WHERE uid = ?2",
            params![Utc::now().to_rfc3339(), uid],
        )?;
        Ok(rows > 0)
    }

    /// Delete a member row by internal uid. Returns true if a row was removed.
    pub fn delete_member_row(&self, uid: i64) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM member WHERE uid = ?1", params![uid])?;
        Ok(rows > 0)
    }

    /// Delete every member of an account. Returns the number removed.
    pub fn delete_members_for_account(&self, account_uid: i64) -> Result<usize, DbError> {
        Ok(self.conn.execute(
            "DELETE FROM member WHERE account_uid = ?1",
            params![account_uid],
        )?)
    }

    /// Delete every non-primary member of an account. Returns the number
    /// removed. The primary member is never touched.
    pub fn delete_non_primary_for_account(&self, account_uid: i64) -> Result<usize, DbError> {
        Ok(self.conn.execute(
            "DELETE FROM member WHERE account_uid = ?1 AND is_primary = 0",
            params![account_uid],
        )?)
    }

    fn map_member_row(row: &Row) -> rusqlite::Result<DbMember> {
        Ok(DbMember {
            uid: row.get(0)?,
            guid: row.get(1)?,
            account_uid: row.get(2)?,
            location_uid: row.get(3)?,
            is_primary: row.get::<_, i64>(4)? != 0,
            joined_date_utc: row.get(5)?,
            cancel_date_utc: row.get(6)?,
            first_name: row.get(7)?,
            last_name: row.get(8)?,
            address: row.get(9)?,
            city: row.get(10)?,
            locale: row.get(11)?,
            postal_code: row.get(12)?,
            cancelled: row.get::<_, i64>(13)? != 0,
            created_utc: row.get(14)?,
            updated_utc: row.get(15)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::test_db;
    use crate::db::DbMember;

    fn sample_member(account_uid: i64, guid: &str, created_utc: &str) -> DbMember {
        DbMember {
            uid: 0,
            guid: guid.to_string(),
            account_uid,
            location_uid: 1,
            is_primary: false,
            joined_date_utc: created_utc.to_string(),
            cancel_date_utc: None,
            first_name: "Test".to_string(),
            last_name: "Member".to_string(),
            address: None,
            city: None,
            locale: None,
            postal_code: None,
            cancelled: false,
            created_utc: created_utc.to_string(),
            updated_utc: None,
        }
    }

    #[test]
    fn test_insert_and_get_member() {
        let db = test_db();
        let mut member = sample_member(1, "mem-1", "2026-01-01T00:00:00+00:00");
        member.is_primary = true;
        let uid = db.insert_member(&member).expect("insert");
        assert!(uid > 0);

        let fetched = db.get_member("mem-1").expect("get").expect("row exists");
        assert_eq!(fetched.uid, uid);
        assert!(fetched.is_primary);
        assert_eq!(fetched.first_name, "Test");

        let missing = db.get_member("nonexistent").expect("get");
        assert!(missing.is_none());
    }

    #[test]
    fn test_counts_scoped_to_account() {
        let db = test_db();
        let mut m1 = sample_member(1, "m1", "2026-01-01T00:00:00+00:00");
        m1.is_primary = true;
        db.insert_member(&m1).expect("insert");
        db.insert_member(&sample_member(1, "m2", "2026-01-02T00:00:00+00:00"))
            .expect("insert");
        db.insert_member(&sample_member(2, "m3", "2026-01-03T00:00:00+00:00"))
            .expect("insert");

        assert_eq!(db.count_members(1).expect("count"), 2);
        assert_eq!(db.count_primary_members(1).expect("count"), 1);
        assert_eq!(db.count_members(2).expect("count"), 1);
        assert_eq!(db.count_primary_members(2).expect("count"), 0);
    }

    #[test]
    fn test_successor_ordering_by_creation_time() {
        let db = test_db();
        let mut primary = sample_member(1, "p", "2026-01-01T00:00:00+00:00");
        primary.is_primary = true;
        let primary_uid = db.insert_member(&primary).expect("insert");
        db.insert_member(&sample_member(1, "younger", "2026-03-01T00:00:00+00:00"))
            .expect("insert");
        db.insert_member(&sample_member(1, "older", "2026-02-01T00:00:00+00:00"))
            .expect("insert");

        let successor = db
            .find_successor(1, primary_uid)
            .expect("query")
            .expect("successor exists");
        assert_eq!(successor.guid, "older");
    }

    #[test]
    fn test_successor_tie_breaks_on_uid() {
        let db = test_db();
        let ts = "2026-01-01T00:00:00+00:00";
        let mut primary = sample_member(1, "p", ts);
        primary.is_primary = true;
        let primary_uid = db.insert_member(&primary).expect("insert");
        // Identical timestamps; insertion order determines uid
        let first_uid = db
            .insert_member(&sample_member(1, "first", ts))
            .expect("insert");
        db.insert_member(&sample_member(1, "second", ts))
            .expect("insert");

        let successor = db
            .find_successor(1, primary_uid)
            .expect("query")
            .expect("successor exists");
        assert_eq!(successor.uid, first_uid);
        assert_eq!(successor.guid, "first");
    }

    #[test]
    fn test_successor_none_when_alone() {
        let db = test_db();
        let mut only = sample_member(1, "only", "2026-01-01T00:00:00+00:00");
        only.is_primary = true;
        let uid = db.insert_member(&only).expect("insert");

        let successor = db.find_successor(1, uid).expect("query");
        assert!(successor.is_none());
    }

    #[test]
    fn test_listing_orders_primary_first() {
        let db = test_db();
        db.insert_member(&sample_member(1, "b", "2026-01-02T00:00:00+00:00"))
            .expect("insert");
        let mut primary = sample_member(1, "p", "2026-01-03T00:00:00+00:00");
        primary.is_primary = true;
        db.insert_member(&primary).expect("insert");
        db.insert_member(&sample_member(1, "a", "2026-01-01T00:00:00+00:00"))
            .expect("insert");

        let members = db.get_members_for_account(1).expect("list");
        let guids: Vec<&str> = members.iter().map(|m| m.guid.as_str()).collect();
        assert_eq!(guids, vec!["p", "a", "b"]);
    }

    #[test]
    fn test_delete_non_primary_leaves_primary() {
        let db = test_db();
        let mut primary = sample_member(1, "p", "2026-01-01T00:00:00+00:00");
        primary.is_primary = true;
        db.insert_member(&primary).expect("insert");
        db.insert_member(&sample_member(1, "n1", "2026-01-02T00:00:00+00:00"))
            .expect("insert");
        db.insert_member(&sample_member(1, "n2", "2026-01-03T00:00:00+00:00"))
            .expect("insert");

        let removed = db.delete_non_primary_for_account(1).expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(db.count_members(1).expect("count"), 1);

        // Second pass removes nothing
        let removed = db.delete_non_primary_for_account(1).expect("delete");
        assert_eq!(removed, 0);
    }
}
