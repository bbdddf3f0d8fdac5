use super::*;

// =============================================================
// ChatState defaults
// =============================================================

#[test]
fn chat_state_default_is_idle_and_disconnected() {
    let state = ChatState::default();
    assert!(state.history.is_empty());
    assert!(!state.loading.is_visible());
    assert_eq!(state.connection, ConnectionStatus::Disconnected);
    assert_eq!(state.input.value(), "");
    assert_eq!(state.scroll.offset(), 0);
}

// =============================================================
// InputField
// =============================================================

#[test]
fn input_field_edits_at_end_of_line() {
    let mut input = InputField::default();
    input.insert('h');
    input.insert_str("ey");
    input.backspace();
    assert_eq!(input.value(), "he");

    input.set("replaced");
    assert_eq!(input.value(), "replaced");

    input.clear();
    assert_eq!(input.value(), "");
}

// =============================================================
// LoadingIndicator
// =============================================================

#[test]
fn loading_indicator_tracks_visible_duration() {
    let start = Instant::now();
    let mut loading = LoadingIndicator::default();
    assert_eq!(loading.visible_for(start), None);

    loading.show(start);
    assert!(loading.is_visible());
    assert_eq!(
        loading.visible_for(start + Duration::from_secs(3)),
        Some(Duration::from_secs(3))
    );

    loading.hide();
    assert!(!loading.is_visible());
}

// =============================================================
// HistoryScroll
// =============================================================

#[test]
fn history_scroll_clamps_and_pins() {
    let mut scroll = HistoryScroll::default();
    scroll.scroll_up(10);
    scroll.clamp(4);
    assert_eq!(scroll.offset(), 4);

    scroll.scroll_down(1);
    assert_eq!(scroll.offset(), 3);

    scroll.scroll_down(10);
    assert_eq!(scroll.offset(), 0);

    scroll.scroll_up(2);
    scroll.pin_to_newest();
    assert_eq!(scroll.offset(), 0);
}

#[test]
fn connection_status_labels() {
    assert_eq!(ConnectionStatus::Connected.label(), "connected");
    assert_eq!(ConnectionStatus::Connecting.label(), "connecting");
    assert_eq!(ConnectionStatus::Disconnected.label(), "disconnected");
}
