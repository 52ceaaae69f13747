/// Immediate-mode UI surface used by the debug overlay
///
/// Every widget call returns `true` when the user changed the value this
/// frame. Implemented by the imgui wrapper and by scripted fakes in tests.
pub trait OverlayUi {
    /// Open a window and build its contents
    fn window(&mut self, title: &str, build: &mut dyn FnMut(&mut dyn OverlayUi));

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;

    /// Sets `*value` to `button_value` when clicked
    fn radio_button(&mut self, label: &str, value: &mut i32, button_value: i32) -> bool;

    fn text(&mut self, text: &str);

    fn separator(&mut self);
}
