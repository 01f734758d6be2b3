//! Directory entries shared by the tests.

use ldapwatch::search::{Entry, Query};

pub const PEOPLE_BASE: &str = "ou=people,dc=planetexpress,dc=com";

/// `cn=<cn>,ou=people,...` with `modifyTimestamp` and `mail` set.
pub fn person(cn: &str, modify_timestamp: &str, mail: &str) -> Entry {
    Entry::new(format!("cn={cn},{PEOPLE_BASE}"))
        .with_attr("cn", [cn])
        .with_attr("modifyTimestamp", [modify_timestamp])
        .with_attr("mail", [mail])
}

pub fn fry(modify_timestamp: &str) -> Entry {
    person("Philip J. Fry", modify_timestamp, "fry@planetexpress.com")
}

/// Query for a single person by `cn` under [`PEOPLE_BASE`].
pub fn person_query(cn: &str) -> Query {
    Query::new(PEOPLE_BASE)
        .filter(format!("(cn={cn})"))
        .attributes(["dn", "mail", "modifyTimestamp"])
}
