//! Focus and value binding scenarios across mount, update and unmount.

use std::cell::Cell;
use std::rc::Rc;

use spark_ui::primitives::{Text, element, show};
use spark_ui::renderer::Mutation;
use spark_ui::{FocusState, Runtime, StateCell, mount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    First,
    Second,
}

// =============================================================================
// FOCUS
// =============================================================================

#[test]
fn test_optional_field_focus_lifecycle() {
    let rt = Runtime::new();
    let root = rt.node_tree().create_element("form").unwrap();
    let focus = FocusState::<Option<Field>>::keyed(&rt);
    let first_visible = StateCell::new(&rt, true);

    let visible = first_visible.clone();
    let first = focus.binding_for(Field::First);
    let view = (
        show(
            move || visible.get(),
            move || element("input", ()).focused(first.clone()),
            None::<fn() -> Text>,
        ),
        element("input", ()).focused(focus.binding_for(Field::Second)),
    );
    let _handle = mount(&rt, root, view).unwrap();

    let runs = Rc::new(Cell::new(0));
    let (state, counter) = (focus.clone(), runs.clone());
    let _observer = rt.effect(move || {
        state.get();
        counter.set(counter.get() + 1);
    });
    assert_eq!(focus.get(), None);
    assert_eq!(runs.get(), 1);

    focus.set(Some(Field::First));
    assert_eq!(focus.get(), Some(Field::First));
    assert_eq!(runs.get(), 2);

    first_visible.set(false);
    assert_eq!(focus.get(), None);
    assert_eq!(runs.get(), 3);
    assert_eq!(focus.storage().registered_count(), 1);
}

#[test]
fn test_user_focus_moves_between_fields() {
    let rt = Runtime::new();
    let root = rt.node_tree().create_element("form").unwrap();
    let focus = FocusState::<Option<Field>>::keyed(&rt);
    let view = (
        element("input", ()).focused(focus.binding_for(Field::First)),
        element("input", ()).focused(focus.binding_for(Field::Second)),
    );
    let _handle = mount(&rt, root, view).unwrap();
    let inputs = rt.node_tree().children(root).unwrap();

    rt.node_tree().focus(inputs[1]).unwrap();
    assert_eq!(focus.get(), Some(Field::Second));

    focus.set(Some(Field::First));
    assert_eq!(rt.node_tree().focused(), Some(inputs[0]));
    assert_eq!(focus.get(), Some(Field::First));

    focus.set(None);
    assert_eq!(rt.node_tree().focused(), None);
    assert_eq!(focus.get(), None);
}

#[test]
fn test_double_binding_keeps_first_target() {
    let rt = Runtime::new();
    let root = rt.node_tree().create_element("form").unwrap();
    let focus = FocusState::<Option<Field>>::keyed(&rt);
    let view = (
        element("input", ()).focused(focus.binding_for(Field::First)),
        element("input", ()).focused(focus.binding_for(Field::First)),
    );
    let _handle = mount(&rt, root, view).unwrap();
    let inputs = rt.node_tree().children(root).unwrap();

    assert_eq!(focus.storage().registered_count(), 1);

    focus.set(Some(Field::First));
    assert_eq!(rt.node_tree().focused(), Some(inputs[0]));

    rt.node_tree().focus(inputs[1]).unwrap();
    assert_eq!(focus.get(), None);

    rt.node_tree().focus(inputs[0]).unwrap();
    assert_eq!(focus.get(), Some(Field::First));
}

#[test]
fn test_blur_with_nothing_registered_stays_none() {
    let rt = Runtime::new();
    let focus = FocusState::<Option<Field>>::keyed(&rt);

    focus.set(None);

    assert_eq!(focus.get(), None);
}

// =============================================================================
// VALUE BINDING
// =============================================================================

#[test]
fn test_value_binding_round_trip() {
    let rt = Runtime::new();
    let root = rt.node_tree().create_element("form").unwrap();
    let name = StateCell::new(&rt, String::from("Ada"));
    let _handle = mount(&rt, root, element("input", ()).bind_value(name.binding())).unwrap();
    let input = rt.node_tree().children(root).unwrap()[0];
    assert_eq!(rt.node_tree().value(input).as_deref(), Some("Ada"));

    rt.node_tree().dispatch_input(input, "Grace").unwrap();
    assert_eq!(name.get(), "Grace");

    rt.node_tree().take_mutations();
    name.set(String::from("Hopper"));
    assert_eq!(
        rt.node_tree().take_mutations(),
        vec![Mutation::SetValue {
            node: input,
            value: String::from("Hopper"),
        }]
    );
}
