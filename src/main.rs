// src/main.rs
//
// Serial weather sensor dashboard for a homecage BME280 monitor.
// Reads `status,temp,hum,pres` lines from an Arduino, shows each channel on
// a three-zone color gauge, and records readings to timestamped CSV files.
//
// Cargo.toml deps used here:
// serialport, chrono, iced (canvas,tokio,advanced), rfd, dirs,
// serde (derive), serde_json

mod app;
mod config;
mod gauge;
mod recording;
mod serial;

use iced::Size;

use crate::app::WeatherApp;

fn main() -> iced::Result {
    iced::application(WeatherApp::title, WeatherApp::update, WeatherApp::view)
        .subscription(WeatherApp::subscription)
        .window(iced::window::Settings {
            size: Size::new(640.0, 470.0),
            resizable: false,
            ..Default::default()
        })
        .antialiasing(true)
        .run()
}
