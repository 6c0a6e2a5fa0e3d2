//! SQLite ledger store

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use corebank_core::{AccountId, Actor, Amount, Currency, CustomerId, TransactionId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::account::{Account, AccountState};
use crate::error::StoreError;
use crate::store::LedgerStore;
use crate::transaction::{ApprovalStatus, ExecutionStatus, Transaction, TransactionType};

const ACCOUNT_COLUMNS: &str =
    "id, customer_id, balance, currency, state, parent_id, opened_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, number, kind, amount, currency, source, destination,
    execution_status, approval_status, requested_by_json, description, decided_by_handler,
    required_role, approved_by, approved_at, rejected_by, rejected_at, comment,
    created_at, updated_at";

/// SQLite-backed ledger store
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
}

impl SqliteLedgerStore {
    /// Open (or create) a store at the given database path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "Opened SQLite ledger store");
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                balance TEXT NOT NULL,
                currency TEXT NOT NULL,
                state TEXT NOT NULL,
                parent_id TEXT,
                opened_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                number TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                source TEXT NOT NULL,
                destination TEXT,
                execution_status TEXT NOT NULL,
                approval_status TEXT NOT NULL,
                requested_by_json TEXT NOT NULL,
                description TEXT,
                decided_by_handler TEXT,
                required_role TEXT,
                approved_by TEXT,
                approved_at TEXT,
                rejected_by TEXT,
                rejected_at TEXT,
                comment TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_approval_status
                ON transactions(approval_status);",
        )?;
        Ok(())
    }

    fn upsert_account(conn: &Connection, account: &Account) -> Result<(), StoreError> {
        conn.execute(
            "INSERT OR REPLACE INTO accounts
             (id, customer_id, balance, currency, state, parent_id, opened_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.id.to_string(),
                account.customer_id.to_string(),
                account.balance.to_string(),
                account.currency.code(),
                account.state.to_string(),
                account.parent_id.map(|id| id.to_string()),
                account.opened_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn upsert_transaction(conn: &Connection, tx: &Transaction) -> Result<(), StoreError> {
        let owner: Option<String> = conn
            .query_row(
                "SELECT id FROM transactions WHERE number = ?1",
                params![tx.number],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(owner) = owner {
            if owner != tx.id.to_string() {
                return Err(StoreError::DuplicateTransactionNumber(tx.number.clone()));
            }
        }

        let requested_by_json = serde_json::to_string(&tx.requested_by)?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO transactions ({TRANSACTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
            ),
            params![
                tx.id.to_string(),
                tx.number,
                tx.kind.to_string(),
                tx.amount.value().to_string(),
                tx.currency.code(),
                tx.source.to_string(),
                tx.destination.map(|id| id.to_string()),
                tx.execution_status.to_string(),
                tx.approval_status.to_string(),
                requested_by_json,
                tx.description,
                tx.decided_by_handler,
                tx.required_role,
                tx.approved_by,
                tx.approved_at.map(|t| t.to_rfc3339()),
                tx.rejected_by,
                tx.rejected_at.map(|t| t.to_rfc3339()),
                tx.comment,
                tx.created_at.to_rfc3339(),
                tx.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn parse<T: FromStr>(field: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("invalid {field}: {value}")))
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("invalid {field}: {value}")))
}

fn parse_opt_time(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(|v| parse_time(field, &v)).transpose()
}

/// Raw text columns of a row, decoded field by field
struct RawRow(Vec<Option<String>>);

impl RawRow {
    fn read(row: &Row<'_>, width: usize) -> rusqlite::Result<Self> {
        let mut columns = Vec::with_capacity(width);
        for i in 0..width {
            columns.push(row.get(i)?);
        }
        Ok(Self(columns))
    }

    fn text(&self, idx: usize, field: &str) -> Result<&str, StoreError> {
        self.0[idx]
            .as_deref()
            .ok_or_else(|| StoreError::Corrupt(format!("missing {field}")))
    }

    fn opt(&self, idx: usize) -> Option<String> {
        self.0[idx].clone()
    }

    fn into_account(self) -> Result<Account, StoreError> {
        Ok(Account {
            id: parse("account id", self.text(0, "id")?)?,
            customer_id: parse::<CustomerId>("customer id", self.text(1, "customer_id")?)?,
            balance: parse::<Decimal>("balance", self.text(2, "balance")?)?,
            currency: parse::<Currency>("currency", self.text(3, "currency")?)?,
            state: parse::<AccountState>("state", self.text(4, "state")?)?,
            parent_id: self.opt(5).map(|p| parse("parent id", &p)).transpose()?,
            opened_at: parse_time("opened_at", self.text(6, "opened_at")?)?,
            updated_at: parse_time("updated_at", self.text(7, "updated_at")?)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction, StoreError> {
        let amount: Decimal = parse("amount", self.text(3, "amount")?)?;
        let amount = Amount::new(amount).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Transaction {
            id: parse::<TransactionId>("transaction id", self.text(0, "id")?)?,
            number: self.text(1, "number")?.to_string(),
            kind: parse::<TransactionType>("kind", self.text(2, "kind")?)?,
            amount,
            currency: parse::<Currency>("currency", self.text(4, "currency")?)?,
            source: parse::<AccountId>("source", self.text(5, "source")?)?,
            destination: self.opt(6).map(|d| parse("destination", &d)).transpose()?,
            execution_status: parse::<ExecutionStatus>(
                "execution_status",
                self.text(7, "execution_status")?,
            )?,
            approval_status: parse::<ApprovalStatus>(
                "approval_status",
                self.text(8, "approval_status")?,
            )?,
            requested_by: serde_json::from_str::<Actor>(self.text(9, "requested_by_json")?)?,
            description: self.opt(10),
            decided_by_handler: self.opt(11),
            required_role: self.opt(12),
            approved_by: self.opt(13),
            approved_at: parse_opt_time("approved_at", self.opt(14))?,
            rejected_by: self.opt(15),
            rejected_at: parse_opt_time("rejected_at", self.opt(16))?,
            comment: self.opt(17),
            created_at: parse_time("created_at", self.text(18, "created_at")?)?,
            updated_at: parse_time("updated_at", self.text(19, "updated_at")?)?,
        })
    }
}

fn account_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    RawRow::read(row, 8)
}

fn transaction_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    RawRow::read(row, 20)
}

impl LedgerStore for SqliteLedgerStore {
    fn find_account(&self, id: AccountId) -> Result<Account, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id.to_string()],
                account_row,
            )
            .optional()?
            .ok_or(StoreError::AccountNotFound(id))?;
        row.into_account()
    }

    fn save_account(&self, account: &Account) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::upsert_account(&conn, account)
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY opened_at"))?;
        let rows = stmt
            .query_map([], account_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_account).collect()
    }

    fn find_transaction(&self, id: TransactionId) -> Result<Transaction, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
                params![id.to_string()],
                transaction_row,
            )
            .optional()?
            .ok_or(StoreError::TransactionNotFound(id))?;
        row.into_transaction()
    }

    fn find_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE number = ?1"),
                params![number],
                transaction_row,
            )
            .optional()?;
        row.map(RawRow::into_transaction).transpose()
    }

    fn save_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::upsert_transaction(&conn, transaction)
    }

    fn transactions_by_approval_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE approval_status = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
            .query_map(params![status.to_string()], transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(RawRow::into_transaction)
            .collect()
    }

    fn commit(&self, accounts: &[Account], transaction: &Transaction) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        for account in accounts {
            Self::upsert_account(&db_tx, account)?;
        }
        Self::upsert_transaction(&db_tx, transaction)?;
        db_tx.commit()?;
        Ok(())
    }
}
