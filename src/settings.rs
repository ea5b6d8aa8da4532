//! Integrator knobs and command line configuration for renders.

use argh::FromArgs;
use glam::{vec3a, Vec3A};

use crate::{
    error::{Error, Result},
    par::Scheduler,
};

/// Parameters of the path tracing estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegratorSettings {
    /// Radiance returned by rays that leave the scene.
    pub background: Vec3A,
    /// Probability of continuing a path after each bounce.
    pub russian_roulette: f32,
    /// Hard cap on path length. Paths cut here lose their remaining energy.
    pub max_bounces: u32,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            background: vec3a(0.235294, 0.67451, 0.843137),
            russian_roulette: 0.8,
            max_bounces: 64,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.russian_roulette > 0.0 && self.russian_roulette <= 1.0) {
            return Err(Error::InvalidSettings(format!(
                "russian roulette probability {} is outside (0, 1]",
                self.russian_roulette
            )));
        }
        if !self.background.is_finite() || self.background.min_element() < 0.0 {
            return Err(Error::InvalidSettings(format!(
                "background {} must be finite and non-negative",
                self.background
            )));
        }
        Ok(())
    }
}

/// Render the built in scene to a PNG.
#[derive(FromArgs, Clone, Debug, PartialEq)]
pub struct RenderArgs {
    /// image width in pixels
    #[argh(option, default = "540")]
    pub width: u32,

    /// image height in pixels
    #[argh(option, default = "540")]
    pub height: u32,

    /// samples per pixel, rounded down to a square for the lane renderer
    #[argh(option, default = "16")]
    pub spp: u32,

    /// seed for every random stream
    #[argh(option, default = "0")]
    pub seed: u64,

    /// russian roulette continuation probability
    #[argh(option, default = "0.8")]
    pub roulette: f32,

    /// maximum path length
    #[argh(option, default = "64")]
    pub max_bounces: u32,

    /// work distribution: 'seq' or 'rayon'
    #[argh(option, default = "Scheduler::Rayon")]
    pub scheduler: Scheduler,

    /// use the lane per sample renderer instead of one task per row
    #[argh(switch)]
    pub lanes: bool,

    /// exponent applied before quantizing to 8 bits
    #[argh(option, default = "0.6")]
    pub gamma: f32,

    /// output file
    #[argh(option, default = "String::from(\"binary.png\")")]
    pub output: String,
}

impl RenderArgs {
    pub fn integrator_settings(&self) -> IntegratorSettings {
        IntegratorSettings {
            russian_roulette: self.roulette,
            max_bounces: self.max_bounces,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidSettings(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.spp == 0 {
            return Err(Error::InvalidSettings("spp must be at least 1".into()));
        }
        if !(self.gamma > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "gamma {} must be positive",
                self.gamma
            )));
        }
        self.integrator_settings().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(IntegratorSettings::default().validate().is_ok());
    }

    #[test]
    fn roulette_must_be_a_probability() {
        for rr in [0.0, -0.5, 1.5, f32::NAN] {
            let settings = IntegratorSettings {
                russian_roulette: rr,
                ..Default::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(Error::InvalidSettings(_))
            ));
        }
        let always = IntegratorSettings {
            russian_roulette: 1.0,
            ..Default::default()
        };
        assert!(always.validate().is_ok());
    }

    #[test]
    fn parses_command_line() {
        let args = RenderArgs::from_args(
            &["cornell"],
            &[
                "--width", "64", "--spp", "4", "--scheduler", "seq", "--lanes", "--roulette",
                "0.5",
            ],
        )
        .unwrap();
        assert_eq!(args.width, 64);
        assert_eq!(args.height, 540);
        assert_eq!(args.spp, 4);
        assert_eq!(args.scheduler, Scheduler::Sequential);
        assert!(args.lanes);
        assert_eq!(args.output, "binary.png");
        assert_eq!(args.integrator_settings().russian_roulette, 0.5);
        assert!(args.validate().is_ok());

        assert!(RenderArgs::from_args(&["cornell"], &["--scheduler", "forte"]).is_err());
    }

    #[test]
    fn rejects_empty_images() {
        let args = RenderArgs::from_args(&["cornell"], &["--width", "0"]).unwrap();
        assert!(args.validate().is_err());
    }
}
