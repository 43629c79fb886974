//! Input dispatch.
//!
//! Every host event goes through [`Session::handle_input`], which matches
//! on the current [`InteractionState`] so that one gesture can never leak
//! into another.

use crate::core::geo::{Point, Size};
use crate::core::session::Session;
use crate::input::events::{EventHandled, InputEvent, KeyCode, KeyModifiers, MouseButton};
use crate::input::interaction::InteractionState;
use crate::Result;
use std::time::Instant;

impl Session {
    /// Dispatch one host event
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<EventHandled> {
        self.handle_input_at(event, Instant::now())
    }

    /// Dispatch one host event at an explicit time (for overlay lifetimes)
    pub fn handle_input_at(&mut self, event: &InputEvent, now: Instant) -> Result<EventHandled> {
        if let Some(position) = event.position() {
            self.pointer = position;
        }

        let handled = match *event {
            InputEvent::PointerDown {
                position,
                button,
                modifiers,
            } => self.on_pointer_down(position, button, modifiers, now),
            InputEvent::PointerMove { position } => self.on_pointer_move(position),
            InputEvent::PointerUp { .. } => self.on_pointer_up(now),
            InputEvent::DoubleClick { position } => self.on_double_click(position),
            InputEvent::Wheel { delta, position } => self.on_wheel(delta, position),
            InputEvent::KeyDown { key, modifiers } => return self.on_key_down(key, modifiers),
            InputEvent::Resize { size } => self.on_resize(size),
        };
        Ok(handled)
    }

    fn on_pointer_down(
        &mut self,
        position: Point,
        button: MouseButton,
        modifiers: KeyModifiers,
        now: Instant,
    ) -> EventHandled {
        if !self.interaction.is_idle() {
            return EventHandled::NotHandled;
        }
        let at = self.screen_to_map(position);

        if button == MouseButton::Left && self.has_map() {
            // Overlay modifiers win over every other gesture
            if modifiers.shift {
                self.overlay.start_measure(at);
                self.interaction = InteractionState::Measuring;
                return EventHandled::Handled;
            }
            if modifiers.command() {
                self.overlay.start_effect(at);
                self.interaction = InteractionState::CastingEffect;
                return EventHandled::Handled;
            }
            if modifiers.alt {
                self.overlay.burst(at, now);
                return EventHandled::Handled;
            }
            if self.fog.is_editing() {
                self.fog.brush(at);
                self.interaction = InteractionState::DrawingFog;
                return EventHandled::Handled;
            }
        }

        if button == MouseButton::Left {
            if let Some(id) = self.tokens.hit_test(&at) {
                if self.start_token_drag(id) {
                    self.interaction = InteractionState::DraggingToken { id, last: position };
                    return EventHandled::Handled;
                }
            }
        }

        // fog editing claims the primary button only
        let pans = button == MouseButton::Middle
            || (button == MouseButton::Left && !self.fog.is_editing());
        if pans {
            self.viewport.start_pan(position);
            self.interaction = InteractionState::Panning;
            return EventHandled::Handled;
        }
        EventHandled::NotHandled
    }

    fn on_pointer_move(&mut self, position: Point) -> EventHandled {
        match self.interaction {
            InteractionState::Idle => {
                let hit = self.tokens.hit_test(&self.screen_to_map(position));
                EventHandled::from_bool(self.tokens.set_hovered(hit))
            }
            InteractionState::Panning => EventHandled::from_bool(self.viewport.update_pan(position)),
            InteractionState::DraggingToken { id, last } => {
                let moved = self.drag_token_by(position.subtract(&last)).is_some();
                self.interaction = InteractionState::DraggingToken { id, last: position };
                EventHandled::from_bool(moved)
            }
            InteractionState::DrawingFog => {
                let at = self.screen_to_map(position);
                log::trace!("fog brush at ({:.1}, {:.1})", at.x, at.y);
                self.fog.brush(at);
                EventHandled::Handled
            }
            InteractionState::Measuring | InteractionState::CastingEffect => {
                let at = self.screen_to_map(position);
                EventHandled::from_bool(self.overlay.update(at))
            }
        }
    }

    fn on_pointer_up(&mut self, now: Instant) -> EventHandled {
        match self.interaction {
            InteractionState::Idle => return EventHandled::NotHandled,
            InteractionState::Panning => self.viewport.end_pan(),
            InteractionState::DraggingToken { .. } => self.end_token_drag(),
            InteractionState::DrawingFog => {}
            InteractionState::Measuring | InteractionState::CastingEffect => {
                self.overlay.finish(now)
            }
        }
        log::trace!("{} finished", self.interaction.name());
        self.interaction = InteractionState::Idle;
        EventHandled::Handled
    }

    fn on_double_click(&mut self, position: Point) -> EventHandled {
        let at = self.screen_to_map(position);
        match self.tokens.hit_test(&at) {
            Some(id) => EventHandled::from_bool(self.cycle_token_color(id).is_some()),
            None => EventHandled::NotHandled,
        }
    }

    /// Resize the token the binding points at, otherwise zoom
    fn on_wheel(&mut self, delta: f64, position: Point) -> EventHandled {
        let binding = self.config.tokens.resize_binding;
        let under_pointer = self.tokens.hit_test(&self.screen_to_map(position));

        let target = self
            .tokens
            .dragging()
            .filter(|_| binding.allows_drag())
            .or_else(|| under_pointer.filter(|_| binding.allows_hover()));
        if let Some(id) = target {
            return EventHandled::from_bool(self.resize_token(id, delta).is_some());
        }
        if under_pointer.is_some() || self.tokens.dragging().is_some() {
            return EventHandled::NotHandled;
        }
        EventHandled::from_bool(self.zoom(delta))
    }

    fn on_key_down(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<EventHandled> {
        match key {
            KeyCode::Delete | KeyCode::Backspace => {
                let removed = self
                    .tokens
                    .delete_target()
                    .and_then(|id| self.remove_token(id));
                if removed.is_none() {
                    return Ok(EventHandled::NotHandled);
                }
                self.tokens.set_hovered(None);
                Ok(EventHandled::Handled)
            }
            KeyCode::Char(_) if modifiers.command() && key.is_char('c') => {
                let copied = match self.tokens.hovered() {
                    Some(id) => self.copy_token(id),
                    None => false,
                };
                Ok(EventHandled::from_bool(copied))
            }
            KeyCode::Char(_) if modifiers.command() && key.is_char('v') => {
                if self.tokens.clipboard().is_none() {
                    return Ok(EventHandled::NotHandled);
                }
                let pasted = self.paste_at_pointer()?;
                Ok(EventHandled::from_bool(pasted.is_some()))
            }
            _ => Ok(EventHandled::NotHandled),
        }
    }

    fn on_resize(&mut self, size: Size) -> EventHandled {
        self.set_container(size);
        EventHandled::Handled
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigProfile, ResizeBinding};
    use crate::core::geo::{Point, Size};
    use crate::core::session::Session;
    use crate::data::loader::MapAsset;
    use crate::data::scene::{ResolvedContent, ResolvedImport};
    use crate::input::events::{EventHandled, InputEvent, KeyCode, KeyModifiers, MouseButton};
    use crate::input::interaction::InteractionState;
    use crate::layers::tokens::NewToken;
    use crate::plugins::overlay::OverlayPrimitive;
    use crate::MapError;
    use std::time::{Duration, Instant};

    /// 800x600 container showing an 800x600 map at scale 1, so screen and
    /// map coordinates coincide
    fn session(profile: ConfigProfile) -> Session {
        let mut session = Session::with_profile(&profile);
        session.set_container(Size::new(800.0, 600.0));
        let ticket = session.begin_map_load("map.png");
        session.finish_import(ResolvedImport {
            generation: ticket.generation(),
            asset: MapAsset::new("map.png", 800, 600),
            content: ResolvedContent::NewMap,
        });
        session
    }

    fn down(x: f64, y: f64, modifiers: KeyModifiers) -> InputEvent {
        InputEvent::PointerDown {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers,
        }
    }

    fn mv(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerMove {
            position: Point::new(x, y),
        }
    }

    fn up(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerUp {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn wheel(delta: f64, x: f64, y: f64) -> InputEvent {
        InputEvent::Wheel {
            delta,
            position: Point::new(x, y),
        }
    }

    fn key(key: KeyCode, modifiers: KeyModifiers) -> InputEvent {
        InputEvent::KeyDown { key, modifiers }
    }

    #[test]
    fn test_drag_token_through_events() {
        let mut session = session(ConfigProfile::Persistent);
        let id = session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)));

        session.handle_input(&down(400.0, 300.0, KeyModifiers::NONE)).unwrap();
        assert_eq!(session.interaction().dragged_token(), Some(id));

        session.handle_input(&mv(450.0, 300.0)).unwrap();
        session.handle_input(&mv(500.0, 310.0)).unwrap();
        session.handle_input(&up(500.0, 310.0)).unwrap();

        assert_eq!(session.token(id).unwrap().position, Point::new(500.0, 310.0));
        assert!(session.interaction().is_idle());
        assert_eq!(session.tokens().dragging(), None);
    }

    #[test]
    fn test_pan_on_empty_map() {
        let mut session = session(ConfigProfile::Persistent);
        session.handle_input(&down(100.0, 100.0, KeyModifiers::NONE)).unwrap();
        assert_eq!(session.interaction(), InteractionState::Panning);

        session.handle_input(&mv(130.0, 80.0)).unwrap();
        session.handle_input(&up(130.0, 80.0)).unwrap();
        assert_eq!(session.view_state().pan(), Point::new(30.0, -20.0));
    }

    #[test]
    fn test_fog_editing_brushes_instead_of_dragging() {
        let mut session = session(ConfigProfile::Persistent);
        let id = session.create_token(NewToken::new("a").at(Point::new(100.0, 100.0)));
        session.set_fog_editing(true);
        session.set_fog_tool(crate::layers::fog::FogTool::Hide);

        session.handle_input(&down(100.0, 100.0, KeyModifiers::NONE)).unwrap();
        assert_eq!(session.interaction(), InteractionState::DrawingFog);
        assert!(session.fog_buffer().is_opaque(100, 100));

        session.handle_input(&mv(700.0, 500.0)).unwrap();
        assert!(session.fog_buffer().is_opaque(700, 500));
        session.handle_input(&up(700.0, 500.0)).unwrap();
        assert_eq!(session.token(id).unwrap().position, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_middle_button_pans_while_fog_editing() {
        let mut session = session(ConfigProfile::Persistent);
        session.set_fog_editing(true);
        let middle = |x: f64, y: f64| InputEvent::PointerDown {
            position: Point::new(x, y),
            button: MouseButton::Middle,
            modifiers: KeyModifiers::NONE,
        };

        let handled = session.handle_input(&middle(100.0, 100.0)).unwrap();
        assert_eq!(handled, EventHandled::Handled);
        assert_eq!(session.interaction(), InteractionState::Panning);
        session.handle_input(&mv(150.0, 100.0)).unwrap();
        session
            .handle_input(&InputEvent::PointerUp {
                position: Point::new(150.0, 100.0),
                button: MouseButton::Middle,
            })
            .unwrap();

        assert_eq!(session.view_state().pan(), Point::new(50.0, 0.0));
        assert!(session.fog_buffer().is_opaque(100, 100));
    }

    #[test]
    fn test_fog_brush_reveals() {
        let mut session = session(ConfigProfile::Persistent);
        session.set_fog_editing(true);

        session.handle_input(&down(200.0, 200.0, KeyModifiers::NONE)).unwrap();
        session.handle_input(&mv(600.0, 200.0)).unwrap();
        session.handle_input(&up(600.0, 200.0)).unwrap();

        assert!(session.fog_buffer().is_revealed(200, 200));
        assert!(session.fog_buffer().is_revealed(600, 200));
        // samples are not joined
        assert!(session.fog_buffer().is_opaque(400, 200));
    }

    #[test]
    fn test_measure_takes_priority_over_token() {
        let mut session = session(ConfigProfile::Persistent);
        session.create_token(NewToken::new("a").at(Point::new(100.0, 100.0)));

        session.handle_input(&down(100.0, 100.0, KeyModifiers::shift())).unwrap();
        assert_eq!(session.interaction(), InteractionState::Measuring);
        session.handle_input(&mv(200.0, 100.0)).unwrap();

        match &session.overlay_primitives()[..] {
            [OverlayPrimitive::Measurement { label, .. }] => assert_eq!(label, "2.0 m"),
            other => panic!("unexpected primitives: {:?}", other),
        }
        session.handle_input(&up(200.0, 100.0)).unwrap();
        assert!(session.overlay_primitives().is_empty());
        assert_eq!(session.tokens().dragging(), None);
    }

    #[test]
    fn test_effect_line_and_burst_expire() {
        let mut session = session(ConfigProfile::Persistent);
        let now = Instant::now();

        session
            .handle_input_at(&down(10.0, 10.0, KeyModifiers::ctrl()), now)
            .unwrap();
        session.handle_input_at(&mv(60.0, 10.0), now).unwrap();
        session.handle_input_at(&up(60.0, 10.0), now).unwrap();
        session
            .handle_input_at(&down(300.0, 300.0, KeyModifiers::alt()), now)
            .unwrap();
        assert!(session.interaction().is_idle());
        assert_eq!(session.overlay_primitives().len(), 2);

        assert_eq!(session.tick(now + Duration::from_secs(4)), 1);
        assert!(matches!(
            session.overlay_primitives()[..],
            [OverlayPrimitive::EffectLine { .. }]
        ));
        assert_eq!(session.tick(now + Duration::from_secs(6)), 1);
        assert!(session.overlay_primitives().is_empty());
    }

    #[test]
    fn test_wheel_resizes_hovered_token_or_zooms() {
        let mut session = session(ConfigProfile::Classic);
        let id = session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)));

        let handled = session.handle_input(&wheel(-1.0, 400.0, 300.0)).unwrap();
        assert_eq!(handled, EventHandled::Handled);
        assert_eq!(session.token(id).unwrap().diameter, 65.0);
        assert_eq!(session.view_state().scale, 1.0);

        session.handle_input(&wheel(-1.0, 50.0, 50.0)).unwrap();
        assert!((session.view_state().scale - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_drag_binding_ignores_hover() {
        let mut config = ConfigProfile::Persistent.resolve();
        config.tokens.resize_binding = ResizeBinding::Drag;
        let mut session = session(ConfigProfile::Custom(config));
        let id = session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)));

        let handled = session.handle_input(&wheel(-1.0, 400.0, 300.0)).unwrap();
        assert_eq!(handled, EventHandled::NotHandled);
        assert_eq!(session.token(id).unwrap().diameter, 60.0);

        session.handle_input(&down(400.0, 300.0, KeyModifiers::NONE)).unwrap();
        session.handle_input(&wheel(1.0, 400.0, 300.0)).unwrap();
        assert_eq!(session.token(id).unwrap().diameter, 55.0);
    }

    #[test]
    fn test_double_click_cycles_color() {
        let mut session = session(ConfigProfile::Persistent);
        let id = session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)));

        let click = InputEvent::DoubleClick {
            position: Point::new(405.0, 300.0),
        };
        session.handle_input(&click).unwrap();
        assert_eq!(session.token(id).unwrap().color_index, 1);
    }

    #[test]
    fn test_delete_hovered_token() {
        let mut session = session(ConfigProfile::Persistent);
        session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)));

        let handled = session
            .handle_input(&key(KeyCode::Delete, KeyModifiers::NONE))
            .unwrap();
        assert_eq!(handled, EventHandled::NotHandled);

        session.handle_input(&mv(400.0, 300.0)).unwrap();
        session
            .handle_input(&key(KeyCode::Backspace, KeyModifiers::NONE))
            .unwrap();
        assert!(session.tokens().is_empty());
        assert_eq!(session.tokens().hovered(), None);
        // revealed fog stays revealed
        assert!(session.fog_buffer().is_revealed(400, 300));
        assert!(session.fog_buffer().is_revealed(400, 385));
    }

    #[test]
    fn test_delete_dragged_token_clears_hover() {
        let mut session = session(ConfigProfile::Persistent);
        let dragged = session.create_token(NewToken::new("a").at(Point::new(200.0, 300.0)));
        let other = session.create_token(NewToken::new("b").at(Point::new(600.0, 300.0)));

        session.handle_input(&down(200.0, 300.0, KeyModifiers::NONE)).unwrap();
        session.tokens.set_hovered(Some(other));
        let handled = session
            .handle_input(&key(KeyCode::Delete, KeyModifiers::NONE))
            .unwrap();

        assert_eq!(handled, EventHandled::Handled);
        assert!(session.token(dragged).is_none());
        assert!(session.token(other).is_some());
        assert_eq!(session.tokens().hovered(), None);
        assert_eq!(session.tokens().dragging(), None);
        assert!(session.interaction().is_idle());
    }

    #[test]
    fn test_copy_paste_at_pointer() {
        let mut session = session(ConfigProfile::Persistent);
        let id = session.create_token(NewToken::new("a").at(Point::new(400.0, 300.0)).label("Orc"));

        session.handle_input(&mv(400.0, 300.0)).unwrap();
        session
            .handle_input(&key(KeyCode::Char('c'), KeyModifiers::ctrl()))
            .unwrap();
        session.handle_input(&mv(100.0, 50.0)).unwrap();
        session
            .handle_input(&key(KeyCode::Char('V'), KeyModifiers::ctrl()))
            .unwrap();

        assert_eq!(session.tokens().len(), 2);
        let pasted = session.tokens().tokens().last().unwrap();
        assert_ne!(pasted.id, id);
        assert_eq!(pasted.position, Point::new(100.0, 50.0));
        assert_eq!(pasted.label, "Orc");
    }

    #[test]
    fn test_paste_without_map_fails() {
        let mut session = Session::default();
        let id = session.create_token(NewToken::new("a"));
        session.copy_token(id);

        let result = session.handle_input(&key(KeyCode::Char('v'), KeyModifiers::ctrl()));
        assert!(matches!(result, Err(MapError::NoMapLoaded)));
    }

    #[test]
    fn test_resize_event_updates_container() {
        let mut session = session(ConfigProfile::Persistent);
        session
            .handle_input(&InputEvent::Resize {
                size: Size::new(1600.0, 1200.0),
            })
            .unwrap();
        // the 800x600 map is now centered with a 400x300 margin
        assert_eq!(
            session.screen_to_map(Point::new(400.0, 300.0)),
            Point::new(0.0, 0.0)
        );
    }
}
