/// Raster controller state machine
use super::types::Command;
use super::units::{ClockEdge, Wires};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ControlState {
    #[default]
    Idle,
    Done,
    Setup,
    QuadGen,
    QuadTest,
    StoreQuad,
}

/// Sequences setup, quad generation, testing and storing for one tile.
///
/// Transitions happen on rising clock edges only. Within a state the checks
/// are ordered; the first matching condition wins.
#[derive(Clone, Debug, Default)]
pub struct RasterControl {
    clock: ClockEdge,
    state: ControlState,
}

impl RasterControl {
    #[inline]
    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn eval(&mut self, clock: bool, w: &mut Wires) {
        if !self.clock.rising(clock) {
            return;
        }

        match self.state {
            ControlState::Idle => {
                if w.cmd == Command::Raster {
                    self.state = ControlState::Setup;
                    w.busy = true;
                    w.done = false;
                    w.start_raster = true;
                }
            }
            ControlState::Done => {
                if w.cmd == Command::Prepare {
                    self.state = ControlState::Idle;
                    Self::clear_outputs(w);
                    w.done = false;
                }
            }
            ControlState::Setup => {
                if w.setup_done {
                    self.request_quad(w);
                }
            }
            ControlState::QuadGen => {
                if w.quad_ready {
                    self.state = ControlState::QuadTest;
                    w.next_quad = false;
                    w.edge_test = true;
                    w.depth_test = true;
                } else if w.end_tile {
                    self.finish(w);
                }
            }
            ControlState::QuadTest => {
                if w.draw_quad && w.depth_ready {
                    self.state = ControlState::StoreQuad;
                    w.store_quad = true;
                } else if w.end_tile {
                    self.finish(w);
                } else if w.discard_quad {
                    self.request_quad(w);
                }
            }
            ControlState::StoreQuad => {
                if w.end_tile {
                    self.finish(w);
                } else if w.quad_stored {
                    self.request_quad(w);
                }
            }
        }
    }

    fn request_quad(&mut self, w: &mut Wires) {
        self.state = ControlState::QuadGen;
        w.next_quad = true;
        w.store_quad = false;
        w.edge_test = false;
        w.depth_test = false;
    }

    fn finish(&mut self, w: &mut Wires) {
        self.state = ControlState::Done;
        Self::clear_outputs(w);
        w.done = true;
    }

    fn clear_outputs(w: &mut Wires) {
        w.busy = false;
        w.start_raster = false;
        w.next_quad = false;
        w.edge_test = false;
        w.depth_test = false;
        w.store_quad = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rise(ctl: &mut RasterControl, w: &mut Wires) {
        ctl.eval(false, w);
        ctl.eval(true, w);
    }

    #[test]
    fn test_raster_command_starts_setup() {
        let mut ctl = RasterControl::default();
        let mut w = Wires { cmd: Command::Raster, ..Default::default() };
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::Setup);
        assert!(w.busy && w.start_raster && !w.done);

        w.setup_done = true;
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::QuadGen);
        assert!(w.next_quad);
    }

    #[test]
    fn test_quad_ready_wins_over_end_tile() {
        let mut ctl = RasterControl { state: ControlState::QuadGen, ..Default::default() };
        let mut w = Wires { quad_ready: true, end_tile: true, ..Default::default() };
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::QuadTest);
        assert!(w.edge_test && w.depth_test && !w.next_quad);
    }

    #[test]
    fn test_store_then_finish_on_end_tile() {
        let mut ctl = RasterControl { state: ControlState::QuadTest, ..Default::default() };
        let mut w = Wires { draw_quad: true, depth_ready: true, end_tile: true, ..Default::default() };
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::StoreQuad);

        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::Done);
        assert!(w.done && !w.busy && !w.store_quad);
    }

    #[test]
    fn test_done_waits_for_prepare() {
        let mut ctl = RasterControl { state: ControlState::Done, ..Default::default() };
        let mut w = Wires { cmd: Command::Raster, done: true, ..Default::default() };
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::Done);

        w.cmd = Command::Prepare;
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::Idle);
        assert!(!w.done);
    }

    #[test]
    fn test_discard_requests_next_quad() {
        let mut ctl = RasterControl { state: ControlState::QuadTest, ..Default::default() };
        let mut w = Wires { discard_quad: true, edge_test: true, ..Default::default() };
        rise(&mut ctl, &mut w);
        assert_eq!(ctl.state(), ControlState::QuadGen);
        assert!(w.next_quad && !w.edge_test);
    }
}
