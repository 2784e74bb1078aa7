//! Employee repository implementation using SQLite
//!
//! Employees and organization policies are reference data maintained
//! outside the engine; this repository reads them and offers seeding
//! helpers for deployments that bootstrap their own database.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Row};
use timeforge_core::timelog::ports::EmployeeRepository as EmployeeRepositoryPort;
use timeforge_domain::{Employee, OrganizationPolicy, Result as DomainResult, TimeForgeError};
use tokio::task;

use super::manager::DbManager;
use super::{map_join_error, map_sql_error, sql_placeholders};

const EMPLOYEE_COLUMNS: &str = "id, organization_id, tenant_id, full_name, bill_rate";

/// SQLite-backed implementation of `EmployeeRepository`
pub struct SqliteEmployeeRepository {
    db: Arc<DbManager>,
    default_policy: OrganizationPolicy,
}

impl SqliteEmployeeRepository {
    /// Create a new repository instance. `default_policy` applies to
    /// organizations without an explicit policy row.
    pub fn new(db: Arc<DbManager>, default_policy: OrganizationPolicy) -> Self {
        Self { db, default_policy }
    }

    /// Insert or update an employee record.
    pub async fn upsert(&self, employee: &Employee) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let employee = employee.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO employees ({EMPLOYEE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    &employee.id,
                    &employee.organization_id,
                    &employee.tenant_id,
                    &employee.full_name,
                    employee.bill_rate,
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Set the explicit policy row for an organization.
    pub async fn set_policy(
        &self,
        organization_id: &str,
        policy: OrganizationPolicy,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let organization_id = organization_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO organization_policies (organization_id, allow_future_dates)
                 VALUES (?1, ?2)",
                params![&organization_id, policy.allow_future_dates],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl EmployeeRepositoryPort for SqliteEmployeeRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Employee> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Employee> {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
                params![&id],
                map_employee_row,
            );

            match result {
                Ok(employee) => Ok(employee),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    Err(TimeForgeError::NotFound(format!("employee {id}")))
                }
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_many(&self, ids: &[String]) -> DomainResult<Vec<Employee>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();

        task::spawn_blocking(move || -> DomainResult<Vec<Employee>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees
                     WHERE id IN ({}) ORDER BY id",
                    sql_placeholders(ids.len())
                ))
                .map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params_from_iter(ids.iter()), map_employee_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn policy_for_organization(
        &self,
        organization_id: &str,
    ) -> DomainResult<OrganizationPolicy> {
        let db = Arc::clone(&self.db);
        let organization_id = organization_id.to_string();
        let default_policy = self.default_policy;

        task::spawn_blocking(move || -> DomainResult<OrganizationPolicy> {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                "SELECT allow_future_dates FROM organization_policies WHERE organization_id = ?1",
                params![&organization_id],
                |row| row.get::<_, bool>(0),
            );

            match result {
                Ok(allow_future_dates) => Ok(OrganizationPolicy { allow_future_dates }),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(default_policy),
                Err(err) => Err(map_sql_error(err)),
            }
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Map a row to an Employee
fn map_employee_row(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        tenant_id: row.get(2)?,
        full_name: row.get(3)?,
        bill_rate: row.get(4)?,
    })
}
