// Catalog - listings shown to a signed-in client
//
// Plain row mapping, no business rules. Empty tables give empty lists.

use rusqlite::{params, Connection};

use crate::db::{account_from_row, ACCOUNT_COLUMNS};
use crate::error::LedgerResult;
use crate::models::{Account, Atm, ClientId, ServiceEntry};

pub fn list_atms(conn: &Connection) -> LedgerResult<Vec<Atm>> {
    let mut stmt = conn.prepare("SELECT id, city, district, street FROM atms ORDER BY id")?;

    let atms = stmt
        .query_map([], |row| {
            Ok(Atm {
                id: row.get(0)?,
                city: row.get(1)?,
                district: row.get(2)?,
                street: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(atms)
}

pub fn list_cards(conn: &Connection, client_id: ClientId) -> LedgerResult<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE client_id = ?1 ORDER BY id",
        ACCOUNT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let cards = stmt
        .query_map(params![client_id], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cards)
}

pub fn list_services(conn: &Connection) -> LedgerResult<Vec<ServiceEntry>> {
    let mut stmt = conn.prepare("SELECT id, name FROM billers ORDER BY id")?;

    let services = stmt
        .query_map([], |row| {
            Ok(ServiceEntry {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{demo_store, setup_database};

    #[test]
    fn test_list_atms() {
        let conn = demo_store();

        let atms = list_atms(&conn).unwrap();

        assert_eq!(atms.len(), 1);
        assert_eq!(atms[0].address(), "Dushanbe, Somoni, Foteh51");
    }

    #[test]
    fn test_list_cards_for_client() {
        let conn = demo_store();

        let cards = list_cards(&conn, 1).unwrap();
        let numbers: Vec<_> = cards.iter().map(|c| c.account_number).collect();

        assert_eq!(numbers, vec![1111, 2222]);
        assert!(list_cards(&conn, 42).unwrap().is_empty());
    }

    #[test]
    fn test_list_services() {
        let conn = demo_store();

        let names: Vec<_> = list_services(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();

        assert_eq!(names, vec!["phone", "internet"]);
    }

    #[test]
    fn test_empty_tables_give_empty_lists() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(list_atms(&conn).unwrap().is_empty());
        assert!(list_services(&conn).unwrap().is_empty());
    }
}
