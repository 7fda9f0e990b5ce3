// command.rs

use embedded_hal::digital::OutputPin;

use crate::*;

/// Remote on/off of the indicator LED. The first "on" also opens the sampler gate;
/// "off" never closes it.
pub struct CommandHandler<P> {
    topic: String,
    indicator: P,
    on: bool,
    state: Arc<Pin<Box<MyState>>>,
}

impl<P: OutputPin> CommandHandler<P> {
    pub fn new(state: Arc<Pin<Box<MyState>>>, mut indicator: P) -> Self {
        indicator.set_low().ok();
        Self {
            topic: state.config.command_topic.clone(),
            indicator,
            on: false,
            state,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    fn set_indicator(&mut self, on: bool) {
        self.on = on;
        let res = if on {
            self.indicator.set_high()
        } else {
            self.indicator.set_low()
        };
        if res.is_err() {
            error!("Cannot drive indicator pin");
        }
    }
}

impl<P: OutputPin> BusHandler for CommandHandler<P> {
    fn subscriptions(&self) -> Vec<String> {
        vec![self.topic.clone()]
    }

    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        if topic != self.topic {
            return;
        }
        match payload {
            b"1" => {
                self.set_indicator(true);
                info!("ON: indicator lit.");
                if self.state.sampler.start() {
                    info!("Climate sampler started.");
                }
            }
            b"0" => {
                self.set_indicator(false);
                info!("OFF: indicator dark.");
            }
            _ => {}
        }
    }
}


// EOF
