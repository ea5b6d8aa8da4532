//! Scene container and the path tracing estimator.

use glam::Vec3A;
use rand::Rng;

use crate::{
    bvh::Bvh,
    error::{Error, Result},
    geometry::{Geometry, Hit, Object},
    material::Material,
    ray::Ray,
    rng::Pcg32,
    scope_print, scope_print_major,
    settings::IntegratorSettings,
    EPSILON,
};

/// Picks an emissive object with probability proportional to its area.
#[derive(Clone, Debug, Default)]
pub struct LightSampler {
    /// Indices into the scene's primitive array.
    objects: Vec<u32>,
    /// Running sum of the emitter areas, `cumulative[i]` includes object `i`.
    cumulative: Vec<f32>,
}

impl LightSampler {
    pub fn new(objects: &[Object], materials: &[Material]) -> Self {
        scope_print!("LightSampler::new");
        let mut sampler = Self::default();
        let mut total = 0.0;
        for (index, object) in objects.iter().enumerate() {
            let emits = materials
                .get(object.material() as usize)
                .is_some_and(Material::has_emission);
            let area = object.area();
            if emits && area > 0.0 {
                total += area;
                sampler.objects.push(index as u32);
                sampler.cumulative.push(total);
            }
        }
        sampler
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn total_area(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Emitter selected by `u` in `[0, 1)`.
    #[inline(always)]
    pub fn pick(&self, u: f32) -> Option<u32> {
        let target = u * self.total_area();
        let slot = self
            .cumulative
            .partition_point(|&c| c <= target)
            .min(self.objects.len().checked_sub(1)?);
        self.objects.get(slot).copied()
    }
}

pub struct Scene {
    bvh: Bvh<Object>,
    materials: Vec<Material>,
    lights: LightSampler,
    settings: IntegratorSettings,
}

impl Scene {
    /// Validates material references and settings, then builds the BVH and the
    /// light table. Objects keep their order, so BVH leaves index into `objects`.
    #[tracing::instrument(skip_all, fields(objects = objects.len(), materials = materials.len()))]
    pub fn new(
        objects: Vec<Object>,
        materials: Vec<Material>,
        settings: IntegratorSettings,
    ) -> Result<Self> {
        scope_print_major!("Scene::new");
        settings.validate()?;
        for (index, object) in objects.iter().enumerate() {
            let material = object.material();
            if material as usize >= materials.len() {
                return Err(Error::MissingMaterial {
                    object: index,
                    material,
                });
            }
        }

        let lights = LightSampler::new(&objects, &materials);
        let bvh = Bvh::build(objects);
        tracing::info!(
            nodes = bvh.nodes().len(),
            emitters = lights.len(),
            emissive_area = lights.total_area(),
            "scene ready"
        );
        if lights.is_empty() {
            tracing::warn!("scene has no emitters");
        }

        Ok(Self {
            bvh,
            materials,
            lights,
            settings,
        })
    }

    pub fn bvh(&self) -> &Bvh<Object> {
        &self.bvh
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &LightSampler {
        &self.lights
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    #[inline(always)]
    fn material(&self, hit: &Hit) -> &Material {
        &self.materials[hit.material as usize]
    }

    /// Nearest hit with `emission` taken from the material table.
    #[inline(always)]
    pub fn intersect(&self, ray: &Ray) -> Hit {
        let mut hit = self.bvh.intersect(ray);
        if hit.happened {
            hit.emission = self.material(&hit).emission;
        }
        hit
    }

    /// A point on an emitter and its density with respect to area over all
    /// emitters. `None` when the scene has no emitters.
    #[inline(always)]
    pub fn sample_light(&self, rng: &mut Pcg32) -> Option<(Hit, f32)> {
        let index = self.lights.pick(rng.random())?;
        let object = self.bvh.primitives().get(index as usize)?;
        let (mut hit, pdf) = object.sample(rng).ok()?;
        hit.emission = self.material(&hit).emission;
        Some((hit, pdf * object.area() / self.lights.total_area()))
    }

    /// Radiance arriving at `ray.origin` from direction `-ray.direction`.
    pub fn cast_ray(&self, ray: &Ray, rng: &mut Pcg32) -> Vec3A {
        let settings = &self.settings;
        let mut hit = self.intersect(ray);
        if !hit.happened {
            return settings.background;
        }
        if self.material(&hit).has_emission() {
            return front_emission(&hit, -ray.direction);
        }

        let mut radiance = Vec3A::ZERO;
        let mut throughput = Vec3A::ONE;
        let mut wo = -ray.direction;
        let mut bounce = 0;
        loop {
            let material = self.material(&hit);
            let n = if hit.normal.dot(wo) < 0.0 {
                -hit.normal
            } else {
                hit.normal
            };

            if !material.is_delta() {
                radiance += throughput * self.direct_light(&hit, wo, n, material, rng);
            }

            if bounce >= settings.max_bounces {
                break;
            }
            if rng.random::<f32>() >= settings.russian_roulette {
                break;
            }

            let wi = material.sample(wo, n, rng);
            let pdf = material.pdf(wi, wo, n);
            if pdf < EPSILON {
                break;
            }
            let f = material.eval(wi, wo, n);
            let weight = if material.is_delta() {
                f / settings.russian_roulette
            } else {
                f * wi.dot(n).max(0.0) / pdf / settings.russian_roulette
            };

            let next_ray = Ray::spawn(hit.point, n, wi);
            let next = self.intersect(&next_ray);
            if !next.happened {
                break;
            }
            if self.material(&next).has_emission() {
                // Light sampling cannot reach a delta lobe, so only mirror
                // paths pick up emission by hitting it.
                if material.is_delta() {
                    radiance += throughput * weight * front_emission(&next, -wi);
                }
                break;
            }

            throughput *= weight;
            if !throughput.is_finite() || throughput.max_element() <= 0.0 {
                break;
            }
            hit = next;
            wo = -wi;
            bounce += 1;
        }

        if radiance.is_finite() {
            radiance
        } else {
            Vec3A::ZERO
        }
    }

    /// Next event estimate of emitted light reflected at `hit` towards `wo`.
    #[inline(always)]
    fn direct_light(
        &self,
        hit: &Hit,
        wo: Vec3A,
        n: Vec3A,
        material: &Material,
        rng: &mut Pcg32,
    ) -> Vec3A {
        let Some((light, pdf)) = self.sample_light(rng) else {
            return Vec3A::ZERO;
        };
        if !(pdf > 0.0) {
            return Vec3A::ZERO;
        }
        let to_light = light.point - hit.point;
        let dist2 = to_light.length_squared();
        let dist = dist2.sqrt();
        if dist < EPSILON {
            return Vec3A::ZERO;
        }
        let wi = to_light / dist;
        let cos_surface = n.dot(wi);
        let cos_light = -wi.dot(light.normal);
        if cos_surface <= 0.0 || cos_light <= 0.0 {
            return Vec3A::ZERO;
        }

        let shadow = Ray::spawn(hit.point, n, wi);
        let occluder = self.intersect(&shadow);
        let light_distance = (light.point - shadow.origin).length();
        if occluder.happened && occluder.distance < light_distance - EPSILON * light_distance.max(1.0) {
            return Vec3A::ZERO;
        }

        light.emission * material.eval(wi, wo, n) * cos_surface * cos_light / dist2 / pdf
    }
}

/// Emission of `hit` seen from `wo`. Emitters only radiate on the side of
/// their geometric normal, matching the light samples drawn by next event
/// estimation.
#[inline(always)]
fn front_emission(hit: &Hit, wo: Vec3A) -> Vec3A {
    if hit.normal.dot(wo) > 0.0 {
        hit.emission
    } else {
        Vec3A::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{Sphere, Triangle},
        test_util::geometry::{horizontal_rect, lamp_over_floor, LAMP},
    };
    use glam::vec3a;

    fn lamp_scene(settings: IntegratorSettings) -> Scene {
        let (objects, materials) = lamp_over_floor((0.5, 0.5), 1.0, 0.5, 4.0);
        Scene::new(objects, materials, settings).unwrap()
    }

    #[test]
    fn missing_material_is_reported() {
        let objects = vec![
            Object::from(Sphere::new(Vec3A::ZERO, 1.0, 0)),
            Object::from(Sphere::new(Vec3A::X, 1.0, 2)),
        ];
        let err = Scene::new(
            objects,
            vec![Material::diffuse(Vec3A::ONE)],
            IntegratorSettings::default(),
        )
        .err();
        assert_eq!(
            err,
            Some(Error::MissingMaterial {
                object: 1,
                material: 2
            })
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = IntegratorSettings {
            russian_roulette: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Scene::new(Vec::new(), Vec::new(), settings),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn empty_scene_shows_background() {
        let scene = Scene::new(Vec::new(), Vec::new(), IntegratorSettings::default()).unwrap();
        let mut rng = Pcg32::new(0, 0);
        let ray = Ray::new_inf(Vec3A::ZERO, Vec3A::Z);
        assert_eq!(scene.cast_ray(&ray, &mut rng), scene.settings().background);
        assert!(scene.sample_light(&mut rng).is_none());
        assert!(scene.lights().pick(0.5).is_none());
    }

    #[test]
    fn light_table_is_area_weighted() {
        let mut objects = Vec::new();
        // Small lamp, a non emitter between, then a lamp three times larger.
        objects.extend(horizontal_rect((0.0, 0.0), (0.5, 0.5), 2.0, true, 1).map(Object::from));
        objects.push(Sphere::new(Vec3A::ZERO, 0.2, 0).into());
        objects.push(Triangle::new(Vec3A::ZERO, vec3a(3.0, 0.0, 0.0), vec3a(0.0, 0.0, 2.0), 1).into());
        let materials = vec![
            Material::diffuse(Vec3A::ONE),
            Material::light(Vec3A::ZERO, Vec3A::ONE),
        ];
        let lights = LightSampler::new(&objects, &materials);
        assert_eq!(lights.len(), 3);
        assert!((lights.total_area() - 4.0).abs() < 1e-6);
        assert_eq!(lights.pick(0.0), Some(0));
        assert_eq!(lights.pick(0.2), Some(1));
        assert_eq!(lights.pick(0.3), Some(3));
        assert_eq!(lights.pick(0.999_999), Some(3));
    }

    #[test]
    fn light_samples_have_uniform_area_density() {
        let scene = lamp_scene(IntegratorSettings::default());
        let mut rng = Pcg32::new(5, 5);
        for _ in 0..1000 {
            let (hit, pdf) = scene.sample_light(&mut rng).unwrap();
            assert_eq!(hit.material, LAMP);
            assert!((hit.point.y - 1.0).abs() < 1e-6);
            assert!(hit.point.x.abs() <= 0.5 + 1e-6 && hit.point.z.abs() <= 0.5 + 1e-6);
            assert!((pdf - 1.0).abs() < 1e-5);
            assert_eq!(hit.emission, Vec3A::splat(4.0));
        }
    }

    #[test]
    fn primary_hit_on_emitter_returns_emission() {
        let scene = lamp_scene(IntegratorSettings::default());
        let mut rng = Pcg32::new(1, 1);
        let ray = Ray::new_inf(vec3a(0.1, 0.2, -0.1), Vec3A::Y);
        assert_eq!(scene.cast_ray(&ray, &mut rng), Vec3A::splat(4.0));
    }

    #[test]
    fn emitter_back_face_is_dark() {
        let scene = lamp_scene(IntegratorSettings::default());
        let mut rng = Pcg32::new(1, 1);
        // The lamp faces down, so looking at it from above sees its back.
        let ray = Ray::new_inf(vec3a(0.1, 2.0, -0.2), -Vec3A::Y);
        assert_eq!(scene.cast_ray(&ray, &mut rng), Vec3A::ZERO);

        let (mut objects, mut materials) = lamp_over_floor((0.5, 0.5), 1.0, 0.5, 4.0);
        materials.push(Material::mirror());
        let mirror = materials.len() as u32 - 1;
        // A mirror above the lamp reflects a downward ray onto its back.
        objects.extend(horizontal_rect((0.0, 0.0), (2.0, 2.0), 1.5, true, mirror).map(Object::from));
        let settings = IntegratorSettings {
            russian_roulette: 1.0,
            ..Default::default()
        };
        let scene = Scene::new(objects, materials, settings).unwrap();
        let ray = Ray::new_inf(vec3a(0.1, 1.2, -0.15), Vec3A::Y);
        assert_eq!(scene.cast_ray(&ray, &mut rng), Vec3A::ZERO);
    }

    #[test]
    fn escaping_ray_shows_background() {
        let settings = IntegratorSettings {
            background: vec3a(0.1, 0.2, 0.3),
            ..Default::default()
        };
        let scene = lamp_scene(settings);
        let mut rng = Pcg32::new(1, 1);
        let ray = Ray::new_inf(vec3a(0.0, 0.5, 0.0), vec3a(1.0, 0.1, 0.0).normalize());
        assert_eq!(scene.cast_ray(&ray, &mut rng), settings.background);
    }

    #[test]
    fn occluded_light_gives_no_direct_light() {
        let (mut objects, mut materials) = lamp_over_floor((0.5, 0.5), 1.0, 0.5, 4.0);
        materials.push(Material::diffuse(Vec3A::ZERO));
        let blocker = materials.len() as u32 - 1;
        objects.extend(horizontal_rect((0.0, 0.0), (5.0, 5.0), 0.5, true, blocker).map(Object::from));
        let settings = IntegratorSettings {
            russian_roulette: 0.5,
            ..Default::default()
        };
        let scene = Scene::new(objects, materials, settings).unwrap();
        let mut rng = Pcg32::new(2, 2);
        // Looking up from below the black blocker at the floor.
        let ray = Ray::new_inf(vec3a(0.1, 0.25, -0.2), -Vec3A::Y);
        for _ in 0..200 {
            assert_eq!(scene.cast_ray(&ray, &mut rng), Vec3A::ZERO);
        }
    }

    #[test]
    fn mirror_sees_the_lamp() {
        let (mut objects, mut materials) = lamp_over_floor((0.5, 0.5), 1.0, 0.5, 4.0);
        materials.push(Material::mirror());
        let mirror = materials.len() as u32 - 1;
        objects.extend(horizontal_rect((0.0, 0.0), (2.0, 2.0), 0.2, false, mirror).map(Object::from));
        let settings = IntegratorSettings {
            russian_roulette: 1.0,
            ..Default::default()
        };
        let scene = Scene::new(objects, materials, settings).unwrap();
        let mut rng = Pcg32::new(3, 3);
        let ray = Ray::new_inf(vec3a(0.1, 0.6, -0.15), -Vec3A::Y);
        let radiance = scene.cast_ray(&ray, &mut rng);
        assert!((radiance - Vec3A::splat(4.0)).abs().max_element() < 1e-4, "{radiance}");
    }

    #[test]
    fn radiance_is_finite_and_non_negative() {
        let scene = lamp_scene(IntegratorSettings::default());
        let mut rng = Pcg32::new(4, 4);
        for i in 0..2000 {
            let dir = crate::sampling::uniform_sphere(rng.random(), rng.random());
            let origin = vec3a(0.0, 0.5, 0.0) + 0.001 * i as f32 * Vec3A::X;
            let l = scene.cast_ray(&Ray::new_inf(origin, dir), &mut rng);
            assert!(l.is_finite());
            assert!(l.min_element() >= 0.0);
        }
    }
}
