use std::time::Duration;

use color_eyre::eyre::Result;
use elmish::prelude::*;
use tokio::time::{interval, sleep};
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Loaded(u32),
    LoadFailed(String),
    Parsed(u32),
    Saved,
    SaveFailed(String),
}

#[derive(Debug, Clone, Default)]
struct Counter {
    count: u32,
    step: u32,
}

async fn load_start(seed: &'static str) -> Result<u32, String> {
    sleep(Duration::from_millis(50)).await;
    seed.parse().map_err(|_| format!("bad seed {seed:?}"))
}

fn parse_step(raw: &'static str) -> Result<u32, std::num::ParseIntError> {
    raw.parse()
}

fn save(count: u32) -> Result<(), String> {
    if count % 4 == 0 {
        Err(format!("refusing to save {count}"))
    } else {
        Ok(())
    }
}

impl Program for Counter {
    type Message = Message;
    type Flags = &'static str;

    fn init(seed: &'static str) -> (Self, Cmd<Self::Message>) {
        let cmd = Cmd::batch([
            Cmd::of_promise(load_start, seed, Message::Loaded, Message::LoadFailed),
            // A malformed step is simply ignored
            Cmd::perform_func(parse_step, "2", Message::Parsed),
            Cmd::perform_func(parse_step, "two", Message::Parsed),
        ]);

        (Self { count: 0, step: 1 }, cmd)
    }

    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message> {
        match msg {
            Message::Tick => {
                self.count += self.step;
                Cmd::batch([
                    Cmd::attempt_func(save, self.count, Message::SaveFailed),
                    Cmd::of_func(
                        |n: u32| Ok::<_, String>(n),
                        self.count,
                        |_| Message::Saved,
                        Message::SaveFailed,
                    ),
                ])
            }
            Message::Loaded(start) => {
                self.count = start;
                Cmd::none()
            }
            Message::LoadFailed(error) | Message::SaveFailed(error) => {
                info!(%error, "effect failed");
                Cmd::none()
            }
            Message::Parsed(step) => {
                self.step = step;
                Cmd::none()
            }
            Message::Saved => Cmd::none(),
        }
    }

    fn subscribe(&self) -> Cmd<Self::Message> {
        let ticks = IntervalStream::new(interval(Duration::from_millis(100)))
            .skip(1) // Skip the first immediate tick
            .take(5);
        Cmd::of_stream(ticks, |_| Message::Tick)
    }

    fn view(&self, _dispatch: &Dispatch<Self::Message>) {
        info!(count = self.count, step = self.step, "view");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RuntimeConfig::default().with_idle_timeout(Duration::from_millis(500));
    let counter = Runtime::<Counter>::with_config("10", config).run().await?;

    println!("final count: {}", counter.count);
    Ok(())
}
