use corpc_client_rs::method::MethodDescriptor;

#[test]
fn new_defaults_to_awaiting_a_response() {
    let m = MethodDescriptor::new(3, 11);
    assert_eq!(m.service_id, 3);
    assert_eq!(m.method_index, 11);
    assert!(!m.fire_and_forget);
}

#[test]
fn fire_and_forget_sets_the_flag() {
    let m = MethodDescriptor::fire_and_forget(3, 11);
    assert!(m.fire_and_forget);
}
