use auditorium_core::{
    open_db_in_memory, ErrorClass, SqliteUserRepository, UserPatch, UserRole, UserService,
    UserServiceError,
};

#[test]
fn create_get_update_delete() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let ada = service
        .create_user(" Ada ", "Ada@Example.org", UserRole::Admin)
        .unwrap();
    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.email, "ada@example.org");
    assert_eq!(service.get_user(ada.id).unwrap(), ada);
    assert_eq!(
        service.get_user_by_email(" ADA@example.org").unwrap(),
        Some(ada.clone())
    );

    let updated = service
        .update_user(
            ada.id,
            UserPatch {
                name: Some("Ada L.".to_string()),
                bio: Some(Some("Analyst".to_string())),
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Ada L.");
    assert_eq!(updated.bio.as_deref(), Some("Analyst"));
    assert_eq!(updated.email, ada.email);

    service.delete_user(ada.id).unwrap();
    let err = service.get_user(ada.id).unwrap_err();
    assert!(matches!(err, UserServiceError::UserNotFound(_)));
    assert_eq!(err.error_class(), ErrorClass::NotFound);
    assert_eq!(service.get_user_by_email("ada@example.org").unwrap(), None);

    // A deleted account releases its email.
    service
        .create_user("Ada", "ada@example.org", UserRole::User)
        .unwrap();
}

#[test]
fn email_must_be_unique_and_well_formed() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    service
        .create_user("Bob", "bob@example.org", UserRole::User)
        .unwrap();
    let err = service
        .create_user("Robert", "BOB@example.org", UserRole::User)
        .unwrap_err();
    assert!(matches!(err, UserServiceError::EmailTaken(_)));
    assert_eq!(err.error_class(), ErrorClass::Conflict);

    let err = service
        .create_user("Eve", "not-an-email", UserRole::User)
        .unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidEmail(_)));

    let err = service
        .create_user("  ", "blank@example.org", UserRole::User)
        .unwrap_err();
    assert!(matches!(err, UserServiceError::Validation(_)));
}

#[test]
fn update_rejects_blank_name() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let cy = service
        .create_user("Cy", "cy@example.org", UserRole::EventCoordinator)
        .unwrap();

    let err = service
        .update_user(
            cy.id,
            UserPatch {
                name: Some(" ".to_string()),
                bio: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, UserServiceError::Validation(_)));
    assert_eq!(service.get_user(cy.id).unwrap().name, "Cy");
}
