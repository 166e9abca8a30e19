use crate::config::{DeviceClass, FluidConfig, SETTINGS_KEY};
use crate::input::InputEvent;
use crate::palette::PaletteName;
use crate::render::Renderer;
use crate::simulation::Simulation;
use eframe::egui;
use glam::Vec2;
use std::time::{Duration, Instant};

/// Pointer id used for the mouse; touch ids come from the platform.
const MOUSE_POINTER_ID: u64 = u64::MAX;

pub struct FluidApp {
    simulation: Simulation,
    renderer: Renderer,
    texture: Option<egui::TextureHandle>,
    device: DeviceClass,
    last_frame: Instant,
    paused: bool,
    show_settings: bool,
    mouse_down: bool,
    touch_seen: bool,
}

impl FluidApp {
    /// Wraps an already initialized simulation. Stored settings replace its
    /// configuration unless `keep_config` is set.
    pub fn new(cc: &eframe::CreationContext<'_>, mut simulation: Simulation, keep_config: bool) -> Self {
        let device = simulation.device();

        if !keep_config {
            if let Some(json) = cc.storage.and_then(|storage| storage.get_string(SETTINGS_KEY)) {
                match FluidConfig::from_json(&json, device) {
                    Ok(config) => {
                        log::info!("restored saved settings");
                        simulation.set_config(config);
                    }
                    Err(err) => log::warn!("ignoring saved settings: {err:#}"),
                }
            }
        }

        simulation.warm_up();

        let (dye_width, dye_height) = simulation.solver().dye_size();
        Self {
            simulation,
            renderer: Renderer::new(dye_width as u32, dye_height as u32),
            texture: None,
            device,
            last_frame: Instant::now(),
            paused: false,
            show_settings: false,
            mouse_down: false,
            touch_seen: false,
        }
    }

    fn controls(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("controls"))
            .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if ui.button(if self.paused { "Resume" } else { "Pause" }).clicked() {
                        self.paused = !self.paused;
                    }
                });
            });

        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| self.settings_ui(ui));
        self.show_settings = open;
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let device = self.device;
        let (sim_width, sim_height) = self.simulation.solver().sim_size();
        let (dye_width, dye_height) = self.simulation.solver().dye_size();
        let config = self.simulation.config_mut();

        ui.label("Touch");
        ui.add(egui::Slider::new(&mut config.touch_splat_radius, 0.05..=1.0).text("Splat radius"));
        ui.add(egui::Slider::new(&mut config.splat_force, 0.0..=5000.0).text("Splat force"));
        ui.add(egui::Slider::new(&mut config.touch_splat_push, 0.0..=1000.0).text("Push"));
        ui.add(egui::Slider::new(&mut config.touch_splat_brightness, 0.0..=1.0).text("Brightness"));

        ui.separator();
        ui.label("Fluid");
        ui.add(egui::Slider::new(&mut config.velocity_dissipation, 0.9..=1.0).text("Velocity dissipation"));
        ui.add(egui::Slider::new(&mut config.density_dissipation, 0.9..=1.0).text("Dye dissipation"));
        ui.add(egui::Slider::new(&mut config.pressure_iterations, 1..=100).text("Pressure iterations"));

        ui.separator();
        ui.label("Auto splats");
        ui.add(egui::Slider::new(&mut config.auto_splat_rate, 0.0..=60.0).text("Rate"));
        ui.add(egui::Slider::new(&mut config.auto_splat_radius, 0.05..=2.0).text("Radius"));
        ui.add(egui::Slider::new(&mut config.auto_splat_velocity, 0.0..=1000.0).text("Velocity"));
        ui.add(egui::Slider::new(&mut config.auto_splat_fade_duration, 0.1..=10.0).text("Fade duration"));
        ui.add(egui::Slider::new(&mut config.auto_splat_push, 0.0..=2000.0).text("Push"));

        ui.separator();
        ui.label("Display");
        ui.add(egui::Slider::new(&mut config.brightness, 0.0..=2.0).text("Brightness"));
        ui.checkbox(&mut config.normalize_hdr, "Normalize HDR");
        ui.checkbox(&mut config.posterize, "Posterize");
        if config.posterize {
            ui.add(egui::Slider::new(&mut config.outline_thickness, 0.0..=8.0).text("Outline thickness"));
        }

        egui::ComboBox::from_label("Palette")
            .selected_text(config.palette.display_name())
            .show_ui(ui, |ui| {
                for palette in PaletteName::ALL {
                    ui.selectable_value(&mut config.palette, palette, palette.display_name());
                }
            });

        ui.separator();
        if ui.button("Reset to defaults").clicked() {
            *config = FluidConfig::for_device(device);
        }
        ui.label(format!(
            "sim {}x{} | dye {}x{} | {} active splats",
            sim_width,
            sim_height,
            dye_width,
            dye_height,
            self.simulation.forcing().len()
        ));
    }

    /// Converts this frame's pointer and touch events into simulation input.
    fn collect_input(&mut self, ctx: &egui::Context, rect: egui::Rect, canvas_hovered: bool) {
        let to_uv = |pos: egui::Pos2| {
            Vec2::new(
                (pos.x - rect.left()) / rect.width().max(1.0),
                1.0 - (pos.y - rect.top()) / rect.height().max(1.0),
            )
        };

        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::Touch { id, phase, pos, .. } => {
                    self.touch_seen = true;
                    let id = id.0;
                    match phase {
                        egui::TouchPhase::Start if canvas_hovered || rect.contains(pos) => {
                            self.simulation.push_event(InputEvent::PointerDown {
                                id,
                                position: to_uv(pos),
                            });
                        }
                        egui::TouchPhase::Move => {
                            self.simulation.push_event(InputEvent::PointerMove {
                                id,
                                position: to_uv(pos),
                            });
                        }
                        egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                            self.simulation.push_event(InputEvent::PointerUp { id });
                        }
                        _ => {}
                    }
                }
                // Touch screens also produce emulated mouse events; skip those.
                _ if self.touch_seen => {}
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    if pressed && canvas_hovered {
                        self.mouse_down = true;
                        self.simulation.push_event(InputEvent::PointerDown {
                            id: MOUSE_POINTER_ID,
                            position: to_uv(pos),
                        });
                    } else if !pressed && self.mouse_down {
                        self.mouse_down = false;
                        self.simulation
                            .push_event(InputEvent::PointerUp { id: MOUSE_POINTER_ID });
                    }
                }
                egui::Event::PointerMoved(pos) if self.mouse_down => {
                    self.simulation.push_event(InputEvent::PointerMove {
                        id: MOUSE_POINTER_ID,
                        position: to_uv(pos),
                    });
                }
                egui::Event::PointerGone if self.mouse_down => {
                    self.mouse_down = false;
                    self.simulation
                        .push_event(InputEvent::PointerUp { id: MOUSE_POINTER_ID });
                }
                _ => {}
            }
        }
    }
}

impl eframe::App for FluidApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        let raw_dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // Stop stepping while minimized; the clamp absorbs the gap on return.
        if ctx.input(|i| i.viewport().minimized.unwrap_or(false)) {
            ctx.request_repaint_after(Duration::from_millis(250));
            return;
        }

        self.controls(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());

                let canvas_width = rect.width().round().max(1.0) as u32;
                let canvas_height = rect.height().round().max(1.0) as u32;
                self.simulation.request_resize(canvas_width, canvas_height);

                self.collect_input(ctx, rect, response.hovered());

                if self.paused {
                    self.simulation.discard_forcing_events();
                } else {
                    self.simulation.frame(raw_dt);
                }

                let (dye_width, dye_height) = self.simulation.solver().dye_size();
                self.renderer.resize(dye_width as u32, dye_height as u32);
                let surface = self.renderer.render(&self.simulation);
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [surface.width() as usize, surface.height() as usize],
                    surface.as_raw(),
                );

                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture = Some(ctx.load_texture("dye", image, egui::TextureOptions::LINEAR));
                    }
                }

                if let Some(texture) = &self.texture {
                    ui.painter().image(
                        texture.id(),
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
            });

        ctx.request_repaint();
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.simulation.config().to_json() {
            Ok(json) => storage.set_string(SETTINGS_KEY, json),
            Err(err) => log::warn!("could not save settings: {err:#}"),
        }
    }
}
