use std::fmt;

use crate::infra::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionKind {
    Move(Point),
    Bust(u32),
    Release,
    Stun(u32),
    Radar,
    Eject(Point),
}

/// One unit's command for the current tick, with an optional debug tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    pub tag: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, tag: None }
    }

    pub fn move_to(target: Point) -> Self {
        Self::new(ActionKind::Move(target))
    }

    pub fn bust(ghost_id: u32) -> Self {
        Self::new(ActionKind::Bust(ghost_id))
    }

    pub fn release() -> Self {
        Self::new(ActionKind::Release)
    }

    pub fn stun(enemy_id: u32) -> Self {
        Self::new(ActionKind::Stun(enemy_id))
    }

    pub fn radar() -> Self {
        Self::new(ActionKind::Radar)
    }

    pub fn eject(target: Point) -> Self {
        Self::new(ActionKind::Eject(target))
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ActionKind::Move(_) => "MOVE",
            ActionKind::Bust(_) => "BUST",
            ActionKind::Release => "RELEASE",
            ActionKind::Stun(_) => "STUN",
            ActionKind::Radar => "RADAR",
            ActionKind::Eject(_) => "EJECT",
        }
    }
}

/// Renders the engine's text command, e.g. `MOVE 800 800 explore`.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::Move(p) | ActionKind::Eject(p) => {
                let (x, y) = p.rounded();
                write!(f, "{} {} {}", self.name(), x, y)?;
            }
            ActionKind::Bust(id) | ActionKind::Stun(id) => write!(f, "{} {}", self.name(), id)?,
            ActionKind::Release | ActionKind::Radar => write!(f, "{}", self.name())?,
        }
        if let Some(tag) = &self.tag {
            write!(f, " {}", tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_form() {
        assert_eq!(
            Action::move_to(Point::new(800.4, 799.6)).to_string(),
            "MOVE 800 800"
        );
        assert_eq!(Action::stun(3).tagged("duel").to_string(), "STUN 3 duel");
        assert_eq!(Action::release().to_string(), "RELEASE");
        assert_eq!(
            Action::eject(Point::new(10.0, 20.0)).to_string(),
            "EJECT 10 20"
        );
    }
}
