//! Authorization table (`AUTOREFS`).
//!
//! Two sections of 3-byte records `code, function, global`. Section 0 lists
//! bed authorizations, section 1 unit authorizations (facility-wide when
//! `global` is set).

use crate::error::{Result, ensure_table};
use crate::guard::AppendGuard;
use crate::types::{AuthorizationInfo, AuthorizationScope, TableInfo};

use super::section;

const RECORD_LEN: usize = 3;

pub fn parse_authorization_table(
    data: &[u8],
    table: &TableInfo,
    out: &mut Vec<AuthorizationInfo>,
) -> Result<()> {
    let mut authorizations = AppendGuard::new(out);
    let file = table.file.as_str();

    ensure_table!(file, table.sections.len() == 2);
    let beds = section(table, 0)?;
    let units = section(table, 1)?;
    ensure_table!(file, beds.stride == RECORD_LEN && units.stride == RECORD_LEN);

    for record in beds.records(data) {
        authorizations.push(AuthorizationInfo {
            scope: AuthorizationScope::Bed,
            code: record[0],
            function: record[1],
        });
    }
    for record in units.records(data) {
        let scope = if record[2] == 0 {
            AuthorizationScope::Unit
        } else {
            AuthorizationScope::Facility
        };
        authorizations.push(AuthorizationInfo {
            scope,
            code: record[0],
            function: record[1],
        });
    }

    authorizations.commit();
    Ok(())
}
