use embassy_stm32::gpio::Input;
use follower_core::buttons::{Button, ButtonInput, ButtonMask};

/// Four push buttons to ground; a low level means pressed.
pub struct ButtonPanel<'d> {
    select: Input<'d>,
    decrement: Input<'d>,
    increment: Input<'d>,
    run: Input<'d>,
}

impl<'d> ButtonPanel<'d> {
    pub fn new(
        select: Input<'d>,
        decrement: Input<'d>,
        increment: Input<'d>,
        run: Input<'d>,
    ) -> Self {
        Self {
            select,
            decrement,
            increment,
            run,
        }
    }

    fn input(&self, button: Button) -> &Input<'d> {
        match button {
            Button::SelectNext => &self.select,
            Button::Decrement => &self.decrement,
            Button::Increment => &self.increment,
            Button::ToggleRun => &self.run,
        }
    }
}

impl ButtonInput for ButtonPanel<'_> {
    fn sample(&mut self) -> ButtonMask {
        Button::ALL
            .into_iter()
            .filter(|button| self.input(*button).is_low())
            .fold(ButtonMask::NONE, ButtonMask::with)
    }
}
