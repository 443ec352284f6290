#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use shaman_rhythm::{
    almanac, config,
    midi::{MidiToneSink, DRUM_CHANNEL},
    sequencer::Rgb,
    theme::{Theme, THEME_ORDER},
    AudioOutput, Config, Journey, KeyPress, MidiOutputDevice, RhythmMachine, Tempo, ThemeId, INSTRUMENTS,
    PRESETS,
};
#[cfg(feature = "gui")]
use shaman_rhythm::journey::{self, Intention, Stage, SESSION_LENGTH};
#[cfg(feature = "gui")]
use std::sync::Arc;
#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::load();
    let app = RhythmApp::new(config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 820.0])
            .with_title("Shaman Rhythm"),
        ..Default::default()
    };

    eframe::run_native(
        "Shaman Rhythm",
        options,
        Box::new(move |cc| {
            apply_theme(&cc.egui_ctx, app.config.appearance.theme.theme());
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct RhythmApp {
    config: Config,
    machine: RhythmMachine,
    // Keeps the cpal stream alive
    audio_output: Option<AudioOutput>,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    tempo_text: String,
    tempo_error: Option<String>,
    today: chrono::NaiveDate,
    journey: Journey,
    show_journey: bool,
    last_frame: Instant,
}

#[cfg(feature = "gui")]
impl RhythmApp {
    fn new(config: Config) -> anyhow::Result<Self> {
        let machine = RhythmMachine::new(&config)?;

        let audio_output = if config.audio.enabled {
            match AudioOutput::new(config.audio.volume) {
                Ok(output) => {
                    machine.emitter().attach(Arc::new(output.voices()));
                    Some(output)
                }
                Err(err) => {
                    tracing::warn!("audio disabled: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let tempo_text = machine.tempo().bpm().to_string();
        Ok(Self {
            config,
            machine,
            audio_output,
            available_midi_ports: MidiOutputDevice::available_ports(),
            selected_port: None,
            tempo_text,
            tempo_error: None,
            today: chrono::Local::now().date_naive(),
            journey: Journey::new(),
            show_journey: false,
            last_frame: Instant::now(),
        })
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let presses: Vec<(KeyPress, bool)> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat,
                        ..
                    } => Some((to_key_press(*key), *repeat)),
                    _ => None,
                })
                .collect()
        });

        for (press, repeat) in presses {
            let suppress = if repeat {
                self.machine.handle_key_repeat(press)
            } else {
                self.machine.handle_key(press)
            };
            if suppress {
                // Don't let space also click a focused button
                ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Space));
            }
        }
    }

    fn select_theme(&mut self, ctx: &egui::Context, id: ThemeId) {
        if self.config.appearance.theme == id {
            return;
        }
        self.config.appearance.theme = id;
        apply_theme(ctx, id.theme());
        tracing::info!(theme = %id, "theme selected");
        self.save_config();
    }

    fn save_config(&mut self) {
        self.machine.write_settings(&mut self.config);
        if let Err(err) = config::save(&self.config) {
            tracing::warn!("failed to save config: {}", err);
        }
    }

    fn connect_midi(&mut self, port_index: usize) {
        let mut device = MidiOutputDevice::new();
        match device.connect(port_index) {
            Ok(()) => {
                self.machine
                    .emitter()
                    .attach(Arc::new(MidiToneSink::new(device, DRUM_CHANNEL)));
                self.selected_port = Some(port_index);
            }
            Err(err) => tracing::warn!("{}", err),
        }
    }

    fn set_tempo(&mut self, tempo: Tempo) {
        self.machine.set_tempo(tempo);
        self.tempo_text = tempo.bpm().to_string();
        self.tempo_error = None;
    }

    fn header_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Rhythm Generator");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let current = self.config.appearance.theme;
                let mut chosen = current;
                egui::ComboBox::from_id_source("theme")
                    .selected_text(format!("{} {}", current.theme().icon, current.theme().name))
                    .show_ui(ui, |ui| {
                        for id in THEME_ORDER {
                            let theme = id.theme();
                            ui.selectable_value(
                                &mut chosen,
                                id,
                                format!("{} {} - {}", theme.icon, theme.name, theme.description),
                            );
                        }
                    });
                if ui.selectable_label(self.show_journey, "Journey").clicked() {
                    self.show_journey = !self.show_journey;
                }
                if ui.button("Cycle").clicked() {
                    chosen = current.cycle();
                }
                ui.label("Theme:");
                if chosen != current {
                    self.select_theme(ui.ctx(), chosen);
                }
            });
        });
        ui.label("Tap pads or use keyboard (Q, W, E, R, A, S, D, F), space to play/stop");
    }

    fn pads_ui(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("pads").spacing([8.0, 8.0]).show(ui, |ui| {
            for (i, pad) in INSTRUMENTS.iter().enumerate() {
                let active = self.machine.is_active(i);
                let fill = if active { color(pad.color) } else { faded(pad.color, 60) };
                let button = egui::Button::new(format!("{}\n{}", pad.name, pad.key))
                    .min_size(egui::vec2(100.0, 70.0))
                    .fill(fill);
                if ui.add(button).clicked() {
                    self.machine.play(i);
                }
                if i % 4 == 3 {
                    ui.end_row();
                }
            }
        });
    }

    fn grid_ui(&mut self, ui: &mut egui::Ui, accent: egui::Color32) {
        let running = self.machine.is_running();
        let current_step = self.machine.current_step();
        let pattern = *self.machine.pattern();

        egui::Grid::new("pattern").spacing([4.0, 4.0]).show(ui, |ui| {
            ui.label("");
            for step in 0..8 {
                let marker = if running && step == current_step { "●" } else { "" };
                ui.colored_label(accent, marker);
            }
            ui.end_row();

            for (y, pad) in INSTRUMENTS.iter().enumerate() {
                ui.colored_label(color(pad.color), pad.name);
                let Some(row) = pattern.row(y) else { continue };
                for (x, &on) in row.iter().enumerate() {
                    let mut button = egui::Button::new("")
                        .min_size(egui::vec2(36.0, 36.0))
                        .fill(if on { color(pad.color) } else { faded(pad.color, 32) });
                    if running && x == current_step {
                        button = button.stroke(egui::Stroke::new(2.0, egui::Color32::WHITE));
                    }
                    if ui.add(button).clicked() {
                        if let Err(err) = self.machine.toggle_cell(y, x) {
                            tracing::warn!("{}", err);
                        }
                    }
                }
                ui.end_row();
            }
        });
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let label = if self.machine.is_running() { "⏸ Stop" } else { "▶ Play" };
            if ui.button(label).clicked() {
                self.machine.toggle_transport();
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let mut bpm = self.machine.tempo().bpm();
            if ui
                .add(egui::Slider::new(&mut bpm, 40..=200).step_by(1.0))
                .changed()
            {
                self.set_tempo(Tempo::clamped(bpm as i64));
            }
            let response = ui.add(egui::TextEdit::singleline(&mut self.tempo_text).desired_width(40.0));
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                match self.machine.set_tempo_input(&self.tempo_text) {
                    Ok(tempo) => self.set_tempo(tempo),
                    Err(err) => self.tempo_error = Some(err.to_string()),
                }
            }

            ui.add_space(20.0);

            if ui.button("Clear").clicked() {
                self.machine.clear();
            }
        });
        if let Some(err) = &self.tempo_error {
            ui.colored_label(egui::Color32::YELLOW, err);
        }
    }

    fn presets_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("Presets:");
        ui.horizontal_wrapped(|ui| {
            for preset in &PRESETS {
                let response = ui
                    .button(preset.name)
                    .on_hover_text(preset.description);
                if response.clicked() {
                    self.machine.load_preset(preset);
                    self.tempo_text = preset.tempo.bpm().to_string();
                    self.tempo_error = None;
                }
            }
        });
    }

    fn midi_ui(&mut self, ui: &mut egui::Ui) {
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_id_source("midi")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(String::as_str)
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name)
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
                if self.selected_port.is_some() && ui.button("Disconnect").clicked() {
                    self.machine.emitter().detach("midi");
                    self.selected_port = None;
                }
            }
        });

        if let Some(port_idx) = selected_port_changed {
            self.connect_midi(port_idx);
        }

        if self.audio_output.is_none() && self.selected_port.is_none() {
            ui.colored_label(
                egui::Color32::YELLOW,
                "⚠ No audio device or MIDI output - pads will only light up",
            );
        }
    }

    fn journey_ui(&mut self, ui: &mut egui::Ui) {
        match self.journey.stage() {
            Stage::Select => {
                ui.heading("Virtual Drum Journey");
                ui.label("Set your intention and let the rhythms guide you inward");
                egui::Grid::new("intentions").spacing([8.0, 8.0]).show(ui, |ui| {
                    for (i, intention) in Intention::ALL.into_iter().enumerate() {
                        let selected = self.journey.intention() == Some(intention);
                        let text = egui::RichText::new(format!("{} {}", intention.icon(), intention))
                            .color(color(intention.color()));
                        if ui
                            .selectable_label(selected, text)
                            .on_hover_text(intention.description())
                            .clicked()
                        {
                            if let Err(err) = self.journey.select(intention) {
                                tracing::warn!("{}", err);
                            }
                        }
                        if i % 2 == 1 {
                            ui.end_row();
                        }
                    }
                });
                let ready = self.journey.intention().is_some();
                if ui.add_enabled(ready, egui::Button::new("Begin Journey")).clicked() {
                    if let Err(err) = self.journey.begin() {
                        tracing::warn!("{}", err);
                    }
                }
            }
            Stage::Prepare => {
                ui.heading("Find a comfortable position...");
                ui.label("Close your eyes and take a deep breath");
                ui.label(format!(
                    "{:.0}",
                    self.journey.prepare_remaining().as_secs_f32().ceil()
                ));
            }
            Stage::Journey => {
                ui.heading(format!(
                    "{} / {}",
                    journey::format_clock(self.journey.elapsed()),
                    journey::format_clock(SESSION_LENGTH)
                ));
                let phase = self.journey.breath_phase();
                let accent = color(self.config.appearance.theme.theme().colors.primary);
                ui.label(egui::RichText::new(phase.label()).size(18.0 * phase.scale()).color(accent));
                ui.add(egui::ProgressBar::new(self.journey.breath_progress()));
                ui.horizontal(|ui| {
                    let label = if self.journey.is_playing() { "⏸ Pause" } else { "▶ Resume" };
                    if ui.button(label).clicked() {
                        let _ = self.journey.toggle_pause();
                    }
                    if ui.button("End Early").clicked() {
                        let _ = self.journey.end_early();
                    }
                });
                if let Some(intention) = self.journey.intention() {
                    ui.horizontal(|ui| {
                        ui.label("Intention:");
                        ui.colored_label(color(intention.color()), intention.title());
                    });
                }
            }
            Stage::Complete => {
                ui.heading("✨ Journey Complete");
                ui.label(format!(
                    "You journeyed for {}",
                    journey::format_clock(self.journey.elapsed())
                ));
                ui.label("Take a moment to integrate your experience before returning to the world.");
                if ui.button("New Journey").clicked() {
                    self.journey.reset();
                }
            }
        }
    }

    fn almanac_ui(&self, ui: &mut egui::Ui) {
        let moon = almanac::moon_phase(self.today);
        ui.heading(format!("{} {}", moon.phase.emoji(), moon.phase));
        ui.label(format!("{}% illuminated, day {}", moon.illumination, moon.age_days));
        ui.label(moon.phase.message());
        ui.small(moon.phase.ceremony());
        ui.separator();
        ui.label("Upcoming:");
        for upcoming in almanac::upcoming_moons(self.today) {
            ui.label(format!(
                "{} {} - {}",
                upcoming.phase.emoji(),
                upcoming.phase,
                upcoming.date.format("%b %-d")
            ));
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for RhythmApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_keys(ctx);
        self.machine.poll();

        let now = Instant::now();
        self.journey.tick(now - self.last_frame);
        self.last_frame = now;

        let mut show_journey = self.show_journey;
        egui::Window::new("Drum Journey")
            .open(&mut show_journey)
            .resizable(false)
            .show(ctx, |ui| self.journey_ui(ui));
        self.show_journey = show_journey;

        let accent = color(self.config.appearance.theme.theme().colors.primary);

        egui::SidePanel::right("almanac")
            .resizable(false)
            .min_width(200.0)
            .show(ctx, |ui| self.almanac_ui(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.header_ui(ui);
            ui.add_space(10.0);
            self.pads_ui(ui);
            ui.add_space(20.0);
            self.grid_ui(ui, accent);
            ui.add_space(20.0);
            self.controls_ui(ui);
            ui.add_space(10.0);
            self.presets_ui(ui);
            ui.separator();
            self.midi_ui(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.save_config();
    }
}

#[cfg(feature = "gui")]
fn to_key_press(key: egui::Key) -> KeyPress {
    if key == egui::Key::Space {
        return KeyPress::Space;
    }
    let mut chars = key.name().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => KeyPress::Char(c),
        _ => KeyPress::Other,
    }
}

#[cfg(feature = "gui")]
fn color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

#[cfg(feature = "gui")]
fn faded(rgb: Rgb, alpha: u8) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgb.0, rgb.1, rgb.2, alpha)
}

#[cfg(feature = "gui")]
fn apply_theme(ctx: &egui::Context, theme: &Theme) {
    let c = &theme.colors;
    let mut visuals = if theme.is_light() {
        egui::Visuals::light()
    } else {
        egui::Visuals::dark()
    };
    visuals.panel_fill = color(c.background);
    visuals.window_fill = color(c.surface);
    visuals.extreme_bg_color = color(c.background_alt);
    visuals.faint_bg_color = color(c.surface);
    visuals.override_text_color = Some(color(c.text));
    visuals.hyperlink_color = color(c.accent);
    visuals.selection.bg_fill = color(c.primary);
    visuals.widgets.inactive.weak_bg_fill = color(c.surface);
    visuals.widgets.hovered.weak_bg_fill = color(c.secondary);
    visuals.widgets.active.weak_bg_fill = color(c.primary);
    ctx.set_visuals(visuals);
}
