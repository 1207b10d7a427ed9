//! TypeScript Generation Tests
//!
//! Validates that Gazelink types can be successfully exported to TypeScript
//! when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, all types are properly configured for TypeScript export.
    fn assert_type<T: Type>() {}

    // Record types
    assert_type::<gazelink::Record>();
    assert_type::<gazelink::FloatRecord>();
    assert_type::<gazelink::IntSample>();
    assert_type::<gazelink::IntEvent>();
    assert_type::<gazelink::ControlRecord>();
    assert_type::<gazelink::MessageRecord>();
    assert_type::<gazelink::IoEvent>();

    // Link state
    assert_type::<gazelink::LinkStatus>();
    assert_type::<gazelink::LinkStats>();
    assert_type::<gazelink::LinkConfig>();
    assert_type::<gazelink::UpdateRate>();
    assert_type::<gazelink::VelocityModel>();
    assert_type::<gazelink::EyeAvailability>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type.
    let _ = gazelink::UpdateRate::Native;
    let _ = gazelink::VelocityModel::FiveSample;
}
