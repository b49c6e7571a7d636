// Application state and iced wiring.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use chrono::Local;
use iced::time;
use iced::widget::{button, column, horizontal_space, pick_list, row, text, Canvas};
use iced::{Alignment, Color, Element, Length, Subscription, Task};

use crate::config::{AppSettings, ChannelConfig, SensorChannels, DEFAULT_COLORS};
use crate::gauge::{parse_hex_color, LinearGauge};
use crate::recording::Recorder;
use crate::serial::{
    Sample, SerialMessage, SerialWorker, CMD_START_RECORDING, CMD_STOP_RECORDING,
};

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    RefreshPorts,
    PortSelected(PortEntry),
    BaudRateSelected(u32),
    Reconnect,
    StartRecording,
    StopRecording,
    ChooseFolder,
    Quit,
}

// ---------------- Port dropdown item ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    port_name: String, // e.g. "COM3"
    display: String,   // e.g. "COM3: USB Serial ..."
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}

// ---------------- App ----------------

pub struct WeatherApp {
    // serial
    worker: Option<SerialWorker>,
    serial_rx: Option<Receiver<SerialMessage>>,

    // available COM ports
    available_ports: Vec<PortEntry>,
    selected_port: Option<PortEntry>,

    // recording
    recorder: Recorder,

    // config
    port_name: String,
    baud_rate: u32,
    channels: SensorChannels,
    colors: [String; 3],
    palette: [Color; 3],

    // latest reading
    last_sample: Option<Sample>,
    last_timestamp: Option<String>,

    // last error (user visible)
    error: Option<String>,
}

impl Default for WeatherApp {
    fn default() -> Self {
        let settings = AppSettings::load().unwrap_or_else(|e| {
            eprintln!("Settings load: {e}");
            AppSettings::default()
        });

        let palette = palette_from(&settings.colors);

        let mut app = Self {
            worker: None,
            serial_rx: None,

            available_ports: Vec::new(),
            selected_port: None,

            recorder: Recorder::new(settings.recording_dir),

            port_name: settings.port_name,
            baud_rate: settings.baud_rate,
            channels: settings.channels,
            colors: settings.colors,
            palette,

            last_sample: None,
            last_timestamp: None,

            error: None,
        };

        app.available_ports = Self::scan_ports();
        app.selected_port = app
            .available_ports
            .iter()
            .find(|p| p.port_name.eq_ignore_ascii_case(&app.port_name))
            .cloned();

        // The device streams continuously; connect right away.
        app.connect();

        app
    }
}

fn palette_from(colors: &[String; 3]) -> [Color; 3] {
    let mut out = [Color::BLACK; 3];
    for (i, c) in colors.iter().enumerate() {
        out[i] = parse_hex_color(c)
            .or_else(|| parse_hex_color(DEFAULT_COLORS[i]))
            .unwrap_or(Color::BLACK);
    }
    out
}

impl WeatherApp {
    pub fn title(&self) -> String {
        "Homecage Weather Sensor".to_string()
    }

    fn scan_ports() -> Vec<PortEntry> {
        let mut out = Vec::new();

        if let Ok(ports) = serialport::available_ports() {
            for p in ports {
                let mut display = p.port_name.clone();

                match p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        let mut parts = Vec::new();
                        if let Some(m) = info.manufacturer {
                            parts.push(m);
                        }
                        if let Some(prod) = info.product {
                            parts.push(prod);
                        }

                        if !parts.is_empty() {
                            display = format!("{}: {}", p.port_name, parts.join(" "));
                        } else {
                            display = format!("{}: USB Serial", p.port_name);
                        }
                    }
                    serialport::SerialPortType::BluetoothPort => {
                        display = format!("{}: Bluetooth", p.port_name)
                    }
                    serialport::SerialPortType::PciPort => display = format!("{}: PCI", p.port_name),
                    serialport::SerialPortType::Unknown => {}
                }

                out.push(PortEntry {
                    port_name: p.port_name,
                    display,
                });
            }
        }

        out.sort_by(|a, b| a.display.cmp(&b.display));
        out
    }

    /// (Re)starts the polling worker for the configured port.
    fn connect(&mut self) {
        self.disconnect();
        let (worker, rx) = SerialWorker::start(self.port_name.clone(), self.baud_rate);
        self.worker = Some(worker);
        self.serial_rx = Some(rx);
    }

    fn disconnect(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.serial_rx = None;
    }

    fn settings(&self) -> AppSettings {
        AppSettings {
            port_name: self.port_name.clone(),
            baud_rate: self.baud_rate,
            recording_dir: self.recorder.dir().to_path_buf(),
            channels: self.channels.clone(),
            colors: self.colors.clone(),
        }
    }

    fn process_serial_message(&mut self, serial_msg: SerialMessage) {
        match serial_msg {
            SerialMessage::Sample(sample) => {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

                if self.recorder.is_recording() {
                    if let Err(e) = self.recorder.append(&timestamp, &sample) {
                        eprintln!("{}: Failed to write to CSV: {}", timestamp, e);
                    }
                }

                self.last_timestamp = Some(timestamp);
                self.last_sample = Some(sample);
            }
            SerialMessage::Error(msg) => {
                self.error = Some(msg);
            }
        }
    }

    fn start_recording(&mut self) {
        if self.worker.is_none() {
            self.error = Some("Not connected to the sensor.".to_string());
            return;
        }

        match self.recorder.start() {
            Ok(()) => {
                if let Some(worker) = &self.worker {
                    worker.send_command(CMD_START_RECORDING);
                }
            }
            Err(e) => self.error = Some(format!("Could not create file: {e}")),
        }
    }

    fn stop_recording(&mut self) {
        if let Some(worker) = &self.worker {
            worker.send_command(CMD_STOP_RECORDING);
        }
        self.recorder.stop();
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let mut pending = Vec::new();
                let mut worker_gone = false;

                if let Some(rx) = self.serial_rx.as_ref() {
                    loop {
                        match rx.try_recv() {
                            Ok(m) => pending.push(m),
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => {
                                worker_gone = true;
                                break;
                            }
                        }
                    }
                }
                for m in pending {
                    self.process_serial_message(m);
                }

                // The loop only exits on its own after a fatal open failure;
                // reap the thread so Record stays disabled until Reconnect.
                if worker_gone {
                    self.disconnect();
                }
            }

            Message::RefreshPorts => {
                self.available_ports = Self::scan_ports();
                self.selected_port = self
                    .available_ports
                    .iter()
                    .find(|p| p.port_name.eq_ignore_ascii_case(&self.port_name))
                    .cloned();
            }

            Message::PortSelected(p) => {
                if self.recorder.is_recording() {
                    return Task::none();
                }
                self.error = None;
                self.port_name = p.port_name.clone();
                self.selected_port = Some(p);
                let _ = self.settings().save();
                self.connect();
            }

            Message::BaudRateSelected(baud) => {
                if self.recorder.is_recording() {
                    return Task::none();
                }
                self.error = None;
                self.baud_rate = baud;
                let _ = self.settings().save();
                self.connect();
            }

            Message::Reconnect => {
                self.error = None;
                self.connect();
            }

            Message::StartRecording => {
                self.error = None;
                self.start_recording();
            }

            Message::StopRecording => {
                self.error = None;
                self.stop_recording();
            }

            Message::ChooseFolder => {
                if self.recorder.is_recording() {
                    return Task::none();
                }
                if let Some(dir) = rfd::FileDialog::new()
                    .set_directory(self.recorder.dir())
                    .pick_folder()
                {
                    self.recorder.set_dir(dir);
                    let _ = self.settings().save();
                }
            }

            Message::Quit => {
                if self.recorder.is_recording() {
                    self.stop_recording();
                }
                let _ = self.settings().save();
                self.disconnect();
                return iced::exit::<Message>();
            }
        }

        Task::none()
    }

    fn sensor_row(&self, cfg: &ChannelConfig, value: Option<f32>) -> Element<'_, Message> {
        let gauge = Canvas::new(LinearGauge::new(
            cfg.clone(),
            self.palette,
            value.unwrap_or(cfg.min),
        ))
        .width(Length::Fixed(340.0))
        .height(Length::Fixed(30.0));

        let scale = row![
            text(format!("{}-", cfg.min)).size(12.0),
            horizontal_space(),
            text(format!("{}+", cfg.max)).size(12.0),
        ];

        let value_text = match value {
            Some(v) => format!("{:.2} {}", v, cfg.unit),
            None => format!("-- {}", cfg.unit),
        };

        row![
            text(cfg.label.clone()).width(Length::Fixed(110.0)),
            column![gauge, scale].width(Length::Fixed(340.0)),
            text(value_text).width(Length::Fixed(110.0)),
        ]
        .spacing(10)
        .align_y(Alignment::Center)
        .into()
    }

    pub fn view(&self) -> Element<'_, Message> {
        fn action_button<'a>(
            label: &'a str,
            enabled: bool,
            msg: Message,
        ) -> iced::widget::Button<'a, Message> {
            let mut b = button(label);
            if enabled {
                b = b.on_press(msg);
            }
            b
        }

        let recording = self.recorder.is_recording();

        let (status_text, status_color) = match self.recorder.file_name() {
            Some(name) => (
                format!("Recording to: {}", name),
                Color::from_rgb8(200, 0, 0),
            ),
            None => ("Not Recording".to_string(), Color::from_rgb8(120, 120, 120)),
        };
        let status = text(status_text).size(22.0).color(status_color);

        let legend = row![
            text("Legend:"),
            text("Low").color(self.palette[0]),
            text("Normal").color(self.palette[1]),
            text("High").color(self.palette[2]),
        ]
        .spacing(8);

        let readings = column![
            self.sensor_row(
                &self.channels.temp,
                self.last_sample.as_ref().map(|s| s.temperature),
            ),
            self.sensor_row(
                &self.channels.hum,
                self.last_sample.as_ref().map(|s| s.humidity),
            ),
            self.sensor_row(
                &self.channels.pres,
                self.last_sample.as_ref().map(|s| s.pressure),
            ),
        ]
        .spacing(8);

        let time_line = text(match &self.last_timestamp {
            Some(t) => format!("Time: {}", t),
            None => "Time: --".to_string(),
        });

        // Stop is enabled and Record disabled while recording, and vice versa.
        let buttons = row![
            action_button(
                "Record",
                !recording && self.worker.is_some(),
                Message::StartRecording,
            ),
            action_button("Stop Recording", recording, Message::StopRecording),
            action_button("Reconnect", !recording, Message::Reconnect),
            action_button("Choose Folder…", !recording, Message::ChooseFolder),
            button("Quit").on_press(Message::Quit),
        ]
        .spacing(10);

        let port_widget: Element<'_, Message> = if recording {
            text(
                self.selected_port
                    .as_ref()
                    .map(|p| p.display.as_str())
                    .unwrap_or(&self.port_name),
            )
            .into()
        } else {
            pick_list(
                self.available_ports.clone(),
                self.selected_port.clone(),
                Message::PortSelected,
            )
            .width(Length::Fixed(340.0))
            .into()
        };

        let baud_options: Vec<u32> = vec![1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];
        let baud_widget: Element<'_, Message> = if recording {
            text(format!("{}", self.baud_rate)).into()
        } else {
            pick_list(baud_options, Some(self.baud_rate), Message::BaudRateSelected)
                .width(Length::Fixed(120.0))
                .into()
        };

        let serial_line = row![text("Port:"), port_widget, text("Baud:"), baud_widget]
            .spacing(10)
            .align_y(Alignment::Center);

        let folder_line = text(format!(
            "Recording folder: {}",
            self.recorder.dir().display()
        ))
        .size(14.0);

        let mut content = column![
            status,
            legend,
            readings,
            time_line,
            buttons,
            serial_line,
            folder_line,
        ]
        .align_x(Alignment::Center)
        .spacing(12)
        .padding(10);

        if let Some(err) = &self.error {
            content = content.push(text(err).color(Color::from_rgb8(255, 0, 0)));
        }

        content.into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let serial_sub = if self.serial_rx.is_some() {
            time::every(Duration::from_millis(100)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let ports_sub = time::every(Duration::from_secs(2)).map(|_| Message::RefreshPorts);

        Subscription::batch(vec![serial_sub, ports_sub])
    }
}
