// End-to-end flow: board data file -> service -> session privileges
use phpbb_acl_core::{AclOptionRecord, OptionIndexTable};
use phpbb_acl_store::{AclBackend, AclService, BoardData, Driver, InMemoryBackend, StoreConfig, UserRecord, UserSession, fetch_all_acl_options};
use proptest::prelude::*;
use std::io::Write;

fn board() -> BoardData {
    BoardData {
        acl_options: vec![
            AclOptionRecord::global("m_edit").with_id(1),
            AclOptionRecord::global("m_delete").with_id(2),
            AclOptionRecord::new("m_lock", true, true).with_id(3),
            AclOptionRecord::local("f_read").with_id(4),
        ],
        users: vec![
            UserRecord::new(1, "Anonymous", ""),
            // global: m_edit only; forum 1: f_read; forum 2: m_lock
            UserRecord::new(2, "moderator", "hra0hs\n8vn08w\nhra0hs"),
        ],
        groups: vec![],
        memberships: vec![],
    }
}

#[test]
fn test_board_file_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "{}", serde_json::to_string(&board())?)?;

    let config = StoreConfig { page_size: 2, ..StoreConfig::default() }.with_driver(Driver::Json).with_data_file(file.path());
    let service = AclService::from_config(config)?;

    let user = service.get_user(2)?.ok_or("missing user")?;
    let mut session = UserSession::from_user(&user)?;
    assert!(session.is_authenticated());

    assert!(session.has_privilege(&service, "m_edit", 0)?);
    assert!(!session.has_privilege(&service, "m_delete", 0)?);
    assert!(session.has_privilege(&service, "f_read", 1)?);
    assert!(!session.has_privilege(&service, "f_read", 2)?);
    assert!(session.has_privilege(&service, "m_lock", 2)?);
    assert!(!session.has_privilege(&service, "m_lock", 0)?);
    // global grant carries into every forum
    assert!(session.has_privilege(&service, "m_edit", 7)?);
    assert!(session.has_privileges(&service, ["m_delete", "!m_lock"], 0)?);

    let guest = service.anonymous_user()?;
    let mut guest_session = UserSession::from_user(&guest)?;
    assert!(!guest_session.is_authenticated());
    assert!(!guest_session.has_privilege(&service, "m_edit", 0)?);

    Ok(())
}

#[test]
fn test_paged_catalog_matches_unpaged_index() -> Result<(), Box<dyn std::error::Error>> {
    let backend = InMemoryBackend::new().with_options(board().acl_options);
    let whole = backend.fetch_acl_options(0, None)?;

    for page_size in 1..6 {
        let paged = fetch_all_acl_options(&backend, page_size)?;
        assert_eq!(OptionIndexTable::from_records(&paged), OptionIndexTable::from_records(&whole));
    }
    Ok(())
}

proptest! {
    #[test]
    fn paged_fetch_preserves_order(
        names in prop::collection::vec("[a-z]_[a-z]{1,4}", 0..30),
        page_size in 1usize..10,
    ) {
        let records: Vec<_> = names.iter().enumerate().map(|(i, name)| AclOptionRecord::new(name.clone(), i % 2 == 0, i % 3 == 0)).collect();
        let backend = InMemoryBackend::new().with_options(records.clone());

        prop_assert_eq!(fetch_all_acl_options(&backend, page_size).unwrap(), records);
    }
}
