use rusqlite::{params, Row};

use super::{AccountStatus, DbAccount, DbError, MemberDb};

impl MemberDb {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert an account row. Returns the assigned internal uid.
    pub fn insert_account(&self, account: &DbAccount) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO account (
                guid, location_uid, status, account_type, payment_amount,
                pend_cancel, pend_cancel_date_utc, period_start_utc,
                period_end_utc, next_billing_utc, end_date_utc,
                created_utc, updated_utc
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                account.guid,
                account.location_uid,
                account.status.as_i64(),
                account.account_type,
                account.payment_amount,
                account.pend_cancel as i32,
                account.pend_cancel_date_utc,
                account.period_start_utc,
                account.period_end_utc,
                account.next_billing_utc,
                account.end_date_utc,
                account.created_utc,
                account.updated_utc,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Look up an account by its public guid.
    pub fn get_account(&self, guid: &str) -> Result<Option<DbAccount>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, guid, location_uid, status, account_type, payment_amount,
                    pend_cancel, pend_cancel_date_utc, period_start_utc,
                    period_end_utc, next_billing_utc, end_date_utc,
                    created_utc, updated_utc
             FROM account WHERE guid = ?1",
        )?;
        let mut rows = stmt.query_map(params![guid], Self::map_account_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// List a location's accounts that are still active, i.e. status below
    /// `Cancelled` in the severity ordering.
    pub fn get_active_accounts(&self, location_uid: i64) -> Result<Vec<DbAccount>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, guid, location_uid, status, account_type, payment_amount,
                    pend_cancel, pend_cancel_date_utc, period_start_utc,
                    period_end_utc, next_billing_utc, end_date_utc,
                    created_utc, updated_utc
             FROM account
             WHERE location_uid = ?1 AND status < ?2
             ORDER BY created_utc, uid",
        )?;
        let rows = stmt.query_map(
            params![location_uid, AccountStatus::Cancelled.as_i64()],
            Self::map_account_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete an account row by internal uid. Returns true if a row was removed.
    pub fn delete_account_row(&self, uid: i64) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM account WHERE uid = ?1", params![uid])?;
        Ok(rows > 0)
    }

    fn map_account_row(row: &Row) -> rusqlite::Result<DbAccount> {
        Ok(DbAccount {
            uid: row.get(0)?,
            guid: row.get(1)?,
            location_uid: row.get(2)?,
            status: AccountStatus::from_i64_lossy(row.get(3)?),
            account_type: row.get(4)?,
            payment_amount: row.get(5)?,
            pend_cancel: row.get::<_, i64>(6)? != 0,
            pend_cancel_date_utc: row.get(7)?,
            period_start_utc: row.get(8)?,
            period_end_utc: row.get(9)?,
            next_billing_utc: row.get(10)?,
            end_date_utc: row.get(11)?,
            created_utc: row.get(12)?,
            updated_utc: row.get(13)?,
        })
    }
}
