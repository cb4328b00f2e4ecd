use std::collections::VecDeque;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui_plot::{HLine, Legend, Line, Plot, PlotPoints};

use flexgauge::FlexConfig;
use flexgauge::output::{GaugeOutput, Presenter};
use flexgauge::session::{Command, ConnectionStatus, SessionSummary, open_serial, run_session};
use flexgauge::signal_processing::Tier;
use flexgauge::transport::{ReaderSource, list_ports};

const MAX_LOG_LINES: usize = 500;
const MAX_HISTORY_SECS: f64 = 120.0;
const MIN_WINDOW_SECS: f64 = 5.0;
const MAX_WINDOW_SECS: f64 = 120.0;

#[derive(Parser, Debug)]
#[command(name = "flexgauge_gui")]
#[command(about = "Flex gauge - GUI", long_about = None)]
struct Args {
    #[arg(short = 'p', long)]
    port: Option<PathBuf>,

    #[arg(short = 'i', long, conflicts_with = "port")]
    input: Option<PathBuf>,

    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(long, conflicts_with_all = ["port", "input"])]
    simulate: bool,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

enum GuiUpdate {
    Frame(GaugeOutput),
    Status(ConnectionStatus),
    Log(String),
    Stopped(Option<SessionSummary>),
}

struct GuiLogger {
    tx: Sender<GuiUpdate>,
    max_level: log::LevelFilter,
}

impl log::Log for GuiLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let msg = format!("[{}] {}", record.level(), record.args());
            let _ = self.tx.send(GuiUpdate::Log(msg));
        }
    }

    fn flush(&self) {}
}

/// Forwards session output to the UI thread
struct ChannelPresenter {
    tx: Sender<GuiUpdate>,
}

impl Presenter for ChannelPresenter {
    fn present(&mut self, output: &GaugeOutput) -> anyhow::Result<()> {
        self.tx
            .send(GuiUpdate::Frame(*output))
            .map_err(|_| anyhow::anyhow!("GUI closed"))
    }

    fn status(&mut self, status: &ConnectionStatus) -> anyhow::Result<()> {
        self.tx
            .send(GuiUpdate::Status(status.clone()))
            .map_err(|_| anyhow::anyhow!("GUI closed"))
    }
}

#[derive(Clone)]
enum SourceChoice {
    Serial(Option<PathBuf>),
    Log(PathBuf),
    Simulated,
}

fn spawn_session(
    choice: SourceChoice,
    config: FlexConfig,
    commands: Receiver<Command>,
    tx: Sender<GuiUpdate>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut presenter = ChannelPresenter { tx: tx.clone() };
        let summary = match run_source(choice, &config, commands, &mut presenter) {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Session error: {:#}", e);
                None
            }
        };
        let _ = tx.send(GuiUpdate::Stopped(summary));
    })
}

fn run_source(
    choice: SourceChoice,
    config: &FlexConfig,
    commands: Receiver<Command>,
    presenter: &mut ChannelPresenter,
) -> anyhow::Result<Option<SessionSummary>> {
    match choice {
        SourceChoice::Serial(port) => {
            let port = match port {
                Some(port) => port,
                None => match list_ports() {
                    Ok(ports) => match ports.into_iter().next() {
                        Some(port) => port,
                        None => {
                            presenter.status(&ConnectionStatus::Failed(
                                "no serial ports found".into(),
                            ))?;
                            return Ok(None);
                        }
                    },
                    Err(e) => {
                        log::error!("{}", e);
                        presenter.status(&ConnectionStatus::Unsupported)?;
                        return Ok(None);
                    }
                },
            };
            match open_serial(&port, config, presenter)? {
                Some(source) => Ok(Some(run_session(source, config, commands, presenter)?)),
                None => Ok(None),
            }
        }
        SourceChoice::Log(path) => {
            let source = ReaderSource::open(&path)?;
            Ok(Some(run_session(source, config, commands, presenter)?))
        }
        SourceChoice::Simulated => run_simulated(config, commands, presenter),
    }
}

#[cfg(feature = "simulation")]
fn run_simulated(
    config: &FlexConfig,
    commands: Receiver<Command>,
    presenter: &mut ChannelPresenter,
) -> anyhow::Result<Option<SessionSummary>> {
    use flexgauge::simulation::{BendProfile, NoiseConfig, SimulatedSource};

    let source = SimulatedSource::new(BendProfile::default(), &NoiseConfig::default(), 50.0)?;
    Ok(Some(run_session(source, config, commands, presenter)?))
}

#[cfg(not(feature = "simulation"))]
fn run_simulated(
    _config: &FlexConfig,
    _commands: Receiver<Command>,
    _presenter: &mut ChannelPresenter,
) -> anyhow::Result<Option<SessionSummary>> {
    anyhow::bail!("Built without the simulation feature")
}

struct History {
    angle: VecDeque<[f64; 2]>,
    displayed: VecDeque<[f64; 2]>,
}

impl History {
    fn new() -> Self {
        Self {
            angle: VecDeque::new(),
            displayed: VecDeque::new(),
        }
    }

    fn push(&mut self, time: f64, output: &GaugeOutput) {
        self.angle.push_back([time, output.angle]);
        self.displayed.push_back([time, output.displayed_angle]);

        let cutoff = time - MAX_HISTORY_SECS;
        for buf in [&mut self.angle, &mut self.displayed] {
            while let Some(front) = buf.front() {
                if front[0] < cutoff {
                    buf.pop_front();
                } else {
                    break;
                }
            }
        }
    }
}

struct FlexGuiApp {
    rx: Receiver<GuiUpdate>,
    tx: Sender<GuiUpdate>,
    config: FlexConfig,
    choice: SourceChoice,
    commands: Option<Sender<Command>>,
    session: Option<thread::JoinHandle<()>>,
    status: ConnectionStatus,
    latest: Option<GaugeOutput>,
    history: History,
    history_window: f64,
    log_lines: VecDeque<String>,
    start: Instant,
    latest_time: f64,
}

impl FlexGuiApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        rx: Receiver<GuiUpdate>,
        tx: Sender<GuiUpdate>,
        config: FlexConfig,
        choice: SourceChoice,
    ) -> Self {
        Self {
            rx,
            tx,
            config,
            choice,
            commands: None,
            session: None,
            status: ConnectionStatus::Disconnected,
            latest: None,
            history: History::new(),
            history_window: 30.0,
            log_lines: VecDeque::new(),
            start: Instant::now(),
            latest_time: 0.0,
        }
    }

    fn connect(&mut self) {
        if self.session.is_some() {
            return;
        }
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        self.commands = Some(cmd_tx);
        self.session = Some(spawn_session(
            self.choice.clone(),
            self.config.clone(),
            cmd_rx,
            self.tx.clone(),
        ));
    }

    fn send(&self, command: Command) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(command);
        }
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.rx.try_recv() {
            match update {
                GuiUpdate::Frame(output) => {
                    self.latest_time = self.start.elapsed().as_secs_f64();
                    self.history.push(self.latest_time, &output);
                    self.latest = Some(output);
                }
                GuiUpdate::Status(status) => {
                    self.status = status;
                }
                GuiUpdate::Log(msg) => {
                    self.log_lines.push_back(msg);
                    while self.log_lines.len() > MAX_LOG_LINES {
                        self.log_lines.pop_front();
                    }
                }
                GuiUpdate::Stopped(summary) => {
                    if let Some(handle) = self.session.take()
                        && handle.join().is_err()
                    {
                        log::error!("Session thread panicked");
                    }
                    self.commands = None;
                    if let Some(summary) = summary {
                        log::info!(
                            "{}: {} samples, {} calibrations",
                            summary.source,
                            summary.samples,
                            summary.calibrations
                        );
                    }
                }
            }
        }
    }

    fn draw_arm(&self, ui: &mut egui::Ui) {
        let desired = egui::vec2(300.0, 320.0);
        let (response, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let rect = response.rect;

        painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(20, 20, 30));

        let segment = rect.height() * 0.38;
        let shoulder = egui::pos2(rect.center().x - 40.0, rect.top() + 20.0);
        let elbow = shoulder + egui::vec2(0.0, segment);

        let (angle, tier) = match &self.latest {
            Some(output) => (output.displayed_angle, output.tier),
            None => (0.0, Tier::Safe),
        };
        let [r, g, b] = tier.color();
        let color = egui::Color32::from_rgb(r, g, b);

        // Straight arm points down; bending swings the forearm forward.
        let rad = (angle as f32).to_radians();
        let wrist = elbow + egui::vec2(rad.sin() * segment, rad.cos() * segment);

        let max_rad = (self.config.angle.max_angle_degrees as f32).to_radians();
        let arc: Vec<egui::Pos2> = (0..=32)
            .map(|i| {
                let a = max_rad * i as f32 / 32.0;
                elbow + egui::vec2(a.sin() * segment * 0.3, a.cos() * segment * 0.3)
            })
            .collect();
        painter.add(egui::Shape::line(
            arc,
            egui::Stroke::new(1.0, egui::Color32::from_rgb(80, 80, 100)),
        ));

        painter.line_segment(
            [shoulder, elbow],
            egui::Stroke::new(14.0, egui::Color32::from_rgb(120, 120, 140)),
        );
        painter.line_segment([elbow, wrist], egui::Stroke::new(12.0, color));
        painter.circle_filled(shoulder, 9.0, egui::Color32::from_rgb(160, 160, 180));
        painter.circle_filled(elbow, 10.0, egui::Color32::WHITE);
        painter.circle_filled(wrist, 7.0, color);

        painter.text(
            egui::pos2(rect.right() - 12.0, rect.bottom() - 12.0),
            egui::Align2::RIGHT_BOTTOM,
            format!("{:.1}°", angle),
            egui::FontId::proportional(28.0),
            color,
        );
        painter.text(
            egui::pos2(rect.left() + 12.0, rect.bottom() - 12.0),
            egui::Align2::LEFT_BOTTOM,
            tier.label(),
            egui::FontId::proportional(16.0),
            color,
        );
    }

    fn draw_plots(&self, ui: &mut egui::Ui) {
        let x_max = self.latest_time.max(self.history_window);
        let x_min = x_max - self.history_window;

        let in_window = |pts: &VecDeque<[f64; 2]>| -> PlotPoints {
            pts.iter().copied().filter(|p| p[0] >= x_min).collect()
        };

        let angle = in_window(&self.history.angle);
        let displayed = in_window(&self.history.displayed);
        Plot::new("angle_plot")
            .height(240.0)
            .include_x(x_min)
            .include_x(x_max)
            .include_y(0.0)
            .include_y(self.config.angle.max_angle_degrees)
            .x_axis_label("s")
            .y_axis_label("deg")
            .y_axis_min_width(60.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.hline(
                    HLine::new("Warning", self.config.tiers.warning_degrees)
                        .color(egui::Color32::YELLOW.gamma_multiply(0.4)),
                );
                plot_ui.hline(
                    HLine::new("Danger", self.config.tiers.danger_degrees)
                        .color(egui::Color32::RED.gamma_multiply(0.4)),
                );
                plot_ui.line(
                    Line::new("Angle", angle)
                        .color(egui::Color32::from_rgb(100, 200, 255).gamma_multiply(0.4))
                        .style(egui_plot::LineStyle::Dashed { length: 4.0 }),
                );
                plot_ui.line(
                    Line::new("Displayed", displayed).color(egui::Color32::from_rgb(100, 200, 255)),
                );
            });
    }
}

impl eframe::App for FlexGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        ctx.request_repaint();

        if ctx.input(|i| i.key_pressed(egui::Key::Q)) {
            self.send(Command::Disconnect);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::C)) {
            self.send(Command::Calibrate);
        }

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let connected = self.session.is_some();
                if connected {
                    if ui.button("Disconnect").clicked() {
                        self.send(Command::Disconnect);
                    }
                } else if ui.button("Connect").clicked() {
                    self.connect();
                }
                if ui
                    .add_enabled(connected, egui::Button::new("Calibrate"))
                    .clicked()
                {
                    self.send(Command::Calibrate);
                }
                ui.separator();

                let status_color = match &self.status {
                    ConnectionStatus::Connected => egui::Color32::from_rgb(100, 255, 100),
                    ConnectionStatus::Failed(_) | ConnectionStatus::Unsupported => {
                        egui::Color32::from_rgb(255, 80, 80)
                    }
                    _ => egui::Color32::LIGHT_GRAY,
                };
                ui.label(
                    egui::RichText::new(self.status.to_string())
                        .color(status_color)
                        .strong(),
                );
                ui.separator();

                match &self.latest {
                    Some(output) => {
                        for (label, value) in [
                            ("Raw:", output.raw.to_string()),
                            ("Offset:", output.offset.to_string()),
                            ("Angle:", format!("{:.1}°", output.angle)),
                        ] {
                            ui.label(egui::RichText::new(label).color(egui::Color32::LIGHT_GRAY));
                            ui.label(
                                egui::RichText::new(value)
                                    .monospace()
                                    .color(egui::Color32::WHITE)
                                    .strong(),
                            );
                        }
                    }
                    None => {
                        ui.label(egui::RichText::new("---").color(egui::Color32::DARK_GRAY));
                    }
                }
            });
        });

        egui::TopBottomPanel::bottom("debug_log")
            .resizable(true)
            .default_height(150.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Debug Log")
                            .color(egui::Color32::LIGHT_GRAY)
                            .strong(),
                    );
                    if ui.small_button("Clear").clicked() {
                        self.log_lines.clear();
                    }
                });
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.label(
                                egui::RichText::new(line)
                                    .font(egui::FontId::monospace(11.0))
                                    .color(egui::Color32::from_rgb(180, 180, 180)),
                            );
                        }
                    });
            });

        egui::SidePanel::left("arm_panel")
            .default_width(330.0)
            .resizable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new("Arm").color(egui::Color32::WHITE).strong());
                    ui.add_space(4.0);
                    self.draw_arm(ui);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Window:").color(egui::Color32::LIGHT_GRAY));
                ui.add(
                    egui::Slider::new(&mut self.history_window, MIN_WINDOW_SECS..=MAX_WINDOW_SECS)
                        .suffix("s")
                        .logarithmic(true),
                );
            });
            ui.add_space(2.0);
            self.draw_plots(ui);
        });
    }
}

impl Drop for FlexGuiApp {
    fn drop(&mut self) {
        self.send(Command::Disconnect);
        self.commands = None;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let (tx, rx) = crossbeam_channel::unbounded::<GuiUpdate>();

    let logger = GuiLogger {
        tx: tx.clone(),
        max_level: log_level,
    };
    log::set_boxed_logger(Box::new(logger)).ok();
    log::set_max_level(log_level);

    let mut config = match &args.config {
        Some(path) => FlexConfig::load(path)?,
        None => FlexConfig::default(),
    };
    // Every animation frame is drawn.
    config.output.output_rate_hz = config.animation.frame_rate_hz;
    config.validate()?;

    let choice = if let Some(path) = args.input {
        SourceChoice::Log(path)
    } else if args.simulate {
        SourceChoice::Simulated
    } else {
        SourceChoice::Serial(args.port)
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 650.0])
            .with_min_inner_size([700.0, 450.0])
            .with_title("Flex Gauge"),
        ..Default::default()
    };

    eframe::run_native(
        "Flex Gauge",
        native_options,
        Box::new(move |cc| Ok(Box::new(FlexGuiApp::new(cc, rx, tx, config, choice)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
