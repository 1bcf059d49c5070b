// SPDX-FileCopyrightText: The spindeck authors
// SPDX-License-Identifier: MPL-2.0

use super::*;

#[test]
fn button_bits() {
    assert_eq!(0b0000_0001, Button::Sfx1.bit());
    assert_eq!(0b0010_0000, Button::Song2.bit());
    assert_eq!(0b0011_1111, ButtonSet::ALL_BITS);
}

#[test]
fn button_set_from_bits() {
    let buttons = ButtonSet::from_bits(0b0010_0001).unwrap();
    assert_eq!(
        vec![Button::Sfx1, Button::Song2],
        buttons.iter().collect::<Vec<_>>()
    );
    for button in [Button::Sfx2, Button::Sfx3, Button::Sfx4, Button::Song1] {
        assert!(!buttons.contains(button));
    }
}

#[test]
fn button_set_rejects_unknown_bits() {
    assert_eq!(None, ButtonSet::from_bits(0b0100_0000));
    assert_eq!(
        ButtonSet::from_bits(0b0000_0001),
        Some(ButtonSet::from_bits_truncate(0b1100_0001))
    );
}

#[test]
fn button_set_collect() {
    let buttons = [Button::Sfx3, Button::Song1].into_iter().collect::<ButtonSet>();
    assert_eq!(0b0001_0100, buttons.bits());
}

#[test]
fn button_set_insert_remove() {
    let mut buttons = ButtonSet::from_bits_truncate(0);
    buttons.insert(Button::Sfx2);
    buttons.insert(Button::Song1);
    buttons.remove(Button::Sfx2);
    assert_eq!(vec![Button::Song1], buttons.iter().collect::<Vec<_>>());
    // Removing an absent button is a no-op
    buttons.remove(Button::Sfx2);
    buttons.remove(Button::Song1);
    assert!(buttons.is_empty());
}

#[test]
fn latch_reports_press_once() {
    let latch = ButtonLatch::default();
    assert!(latch.pressed().is_empty());
    assert!(latch.press(Button::Sfx2, 1_000_000));
    let reported = latch.pressed();
    assert!(reported.contains(Button::Sfx2));
    latch.clear(reported);
    // Still held down, but no new edge
    assert!(latch.pressed().is_empty());
}

#[test]
fn latch_debounces_presses() {
    let latch = ButtonLatch::new(Duration::from_millis(50));
    assert!(latch.press(Button::Song1, 1_000_000));
    latch.clear(latch.pressed());
    // Contact bounce within the debounce interval
    assert!(!latch.press(Button::Song1, 1_020_000));
    assert!(!latch.press(Button::Song1, 1_050_000));
    assert!(latch.pressed().is_empty());
    assert!(latch.press(Button::Song1, 1_050_001));
    assert!(latch.pressed().contains(Button::Song1));
}

#[test]
fn latch_debounces_buttons_independently() {
    let latch = ButtonLatch::default();
    assert!(latch.press(Button::Sfx1, 0));
    assert!(latch.press(Button::Sfx4, 10));
    assert_eq!(
        [Button::Sfx1, Button::Sfx4].into_iter().collect::<ButtonSet>(),
        latch.pressed()
    );
}

#[test]
fn latch_clear_preserves_new_presses() {
    let latch = ButtonLatch::default();
    latch.press(Button::Sfx1, 0);
    let reported = latch.pressed();
    // Pressed after the snapshot has been taken
    latch.press(Button::Sfx3, 100);
    latch.clear(reported);
    assert_eq!(
        ButtonSet::from_bits(Button::Sfx3.bit()),
        Some(latch.pressed())
    );
}

#[test]
#[allow(clippy::float_cmp)]
fn adc_to_position() {
    assert_eq!(0.0, u12_to_position(0));
    assert_eq!(1.0, u12_to_position(ADC_MAX));
    assert_eq!(1.0, u12_to_position(u16::MAX));
    assert!(u12_to_position(2048) > 0.5);
}
