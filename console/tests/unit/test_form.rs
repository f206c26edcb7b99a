//! Form state machine tests

use opsconsole::errors::ConsoleError;
use opsconsole::mutation::form::{FormEvent, FormState, FormStatus};
use platform_models::{ProjectCreate, ServerCreate};

#[test]
fn test_form_initial_state() {
    let form: FormState<ProjectCreate> = FormState::new("Create", "Creating...");
    assert_eq!(form.status(), &FormStatus::Editing);
    assert!(!form.is_open());
    assert!(form.error().is_none());
    assert_eq!(form.payload(), &ProjectCreate::default());
}

#[test]
fn test_second_submit_refused_while_submitting() {
    let mut form: FormState<ServerCreate> = FormState::new("Add Server", "Adding...");
    form.open();

    form.begin_submit().unwrap();
    let second = form.begin_submit();
    assert!(matches!(second, Err(ConsoleError::FormError(_))));
    assert_eq!(form.submit_label(), "Adding...");
}

#[test]
fn test_edit_refused_while_submitting() {
    let mut form: FormState<ProjectCreate> = FormState::new("Create", "Creating...");
    form.begin_submit().unwrap();

    assert!(form.edit(|p| p.name = "late".to_string()).is_err());
    assert!(form.payload().name.is_empty());
}

#[test]
fn test_resubmit_after_failure() {
    let mut form: FormState<ProjectCreate> = FormState::new("Create", "Creating...");
    form.open();

    form.begin_submit().unwrap();
    form.fail("name is required").unwrap();
    assert_eq!(form.error(), Some("name is required"));

    // Editing clears the failure
    form.edit(|p| p.name = "api".to_string()).unwrap();
    assert_eq!(form.status(), &FormStatus::Editing);

    let payload = form.begin_submit().unwrap();
    assert_eq!(payload.name, "api");
    form.process(FormEvent::Success).unwrap();
    assert_eq!(form.status(), &FormStatus::Succeeded);
}

#[test]
fn test_update_form_keeps_fields_on_success() {
    let current = ProjectCreate {
        name: "web".to_string(),
        organization_id: 1,
        ..Default::default()
    };
    let mut form = FormState::for_update("Save", "Saving...", current.clone());
    form.open();

    form.begin_submit().unwrap();
    form.succeed().unwrap();

    assert!(form.is_open());
    assert_eq!(form.payload(), &current);
}
