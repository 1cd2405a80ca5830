use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Narrowphase primitive tests.
pub struct Narrowphase;

/// One axis of a slab test: the parametric interval during which the moving
/// interval `[lo, hi]` overlaps `[t_lo, t_hi]`, plus the entry normal sign.
/// `None` when the axis is static and disjoint.
fn axis_interval(lo: f32, hi: f32, v: f32, target_lo: f32, target_hi: f32) -> Option<(f32, f32, f32)> {
    if v > 0.0 {
        Some(((target_lo - hi) / v, (target_hi - lo) / v, -1.0))
    } else if v < 0.0 {
        Some(((target_hi - lo) / v, (target_lo - hi) / v, 1.0))
    } else if hi < target_lo || lo > target_hi {
        None
    } else {
        Some((f32::NEG_INFINITY, f32::INFINITY, 0.0))
    }
}

/// Slab clip of `origin + t * dir` against `[min, max]`, starting from
/// `[t_min, t_max]`. Returns the clipped interval and the entry normal.
fn clip_ray(origin: Vec2, dir: Vec2, min: Vec2, max: Vec2, mut t_min: f32, mut t_max: f32) -> Option<(f32, f32, Vec2)> {
    let mut n_enter = Vec2::ZERO;
    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t1 = (lo - o) * inv;
        let mut t2 = (hi - o) * inv;
        let mut sign = -1.0;
        if t1 > t2 {
            core::mem::swap(&mut t1, &mut t2);
            sign = 1.0;
        }
        if t1 > t_min {
            t_min = t1;
            n_enter = Vec2::ZERO;
            n_enter[axis] = sign;
        }
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }
    Some((t_min, t_max, n_enter))
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    const EPS: f32 = 1e-6;
    if cross(b - a, p - a).abs() > EPS {
        return false;
    }
    let lo = a.min(b) - Vec2::splat(EPS);
    let hi = a.max(b) + Vec2::splat(EPS);
    p.x >= lo.x && p.x <= hi.x && p.y >= lo.y && p.y <= hi.y
}

impl NarrowphaseApi for Narrowphase {
    fn sweep_rect(mover: &Rect, velocity: Vec2, target: &Rect) -> Option<SweepHit> {
        let (ex, xx, nx) = axis_interval(mover.left(), mover.right(), velocity.x, target.left(), target.right())?;
        let (ey, xy, ny) = axis_interval(mover.bottom(), mover.top(), velocity.y, target.bottom(), target.top())?;

        let t_enter = ex.max(ey);
        let t_exit = xx.min(xy);
        if t_enter > t_exit || t_exit < 0.0 {
            return None;
        }

        // The axis that entered last is the struck face; ties go to X.
        let normal = if t_enter < 0.0 {
            Self::contact_normal(mover, target)
        } else if ey > ex {
            Vec2::new(0.0, ny)
        } else {
            Vec2::new(nx, 0.0)
        };
        Some(SweepHit { toi: t_enter.max(0.0), normal })
    }

    fn penetration(a: &Rect, b: &Rect) -> Option<Overlap> {
        let d = a.center() - b.center();
        let reach = a.half_size() + b.half_size();
        let ox = reach.x - d.x.abs();
        let oy = reach.y - d.y.abs();
        if ox <= 0.0 || oy <= 0.0 {
            return None;
        }
        let (depth, normal) = if ox <= oy {
            (ox, Vec2::new(if d.x >= 0.0 { 1.0 } else { -1.0 }, 0.0))
        } else {
            (oy, Vec2::new(0.0, if d.y >= 0.0 { 1.0 } else { -1.0 }))
        };
        Some(Overlap { normal, depth })
    }

    fn contact_normal(a: &Rect, b: &Rect) -> Vec2 {
        let d = a.center() - b.center();
        let reach = a.half_size() + b.half_size();
        let ox = reach.x - d.x.abs();
        let oy = reach.y - d.y.abs();
        if ox <= oy {
            Vec2::new(if d.x >= 0.0 { 1.0 } else { -1.0 }, 0.0)
        } else {
            Vec2::new(0.0, if d.y >= 0.0 { 1.0 } else { -1.0 })
        }
    }

    fn ray_aabb(origin: Vec2, dir: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SweepHit> {
        let (t_min, _, n_enter) = clip_ray(origin, dir, aabb_min, aabb_max, f32::NEG_INFINITY, f32::INFINITY)?;
        // Origin inside: immediate hit with no defined face.
        if t_min < 0.0 {
            let (_, t_max, _) = clip_ray(origin, dir, aabb_min, aabb_max, 0.0, f32::INFINITY)?;
            if t_max < 0.0 {
                return None;
            }
            return Some(SweepHit { toi: 0.0, normal: Vec2::ZERO });
        }
        Some(SweepHit { toi: t_min, normal: n_enter })
    }

    fn line_segment_aabb(a: Vec2, b: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SweepHit> {
        let (toi, _, n_enter) = clip_ray(a, b - a, aabb_min, aabb_max, 0.0, 1.0)?;
        let normal = if toi == 0.0 && Rect::from_min_max(aabb_min, aabb_max).contains_point(a) {
            Vec2::ZERO
        } else {
            n_enter
        };
        Some(SweepHit { toi, normal })
    }

    fn segments_intersect(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool {
        let r = a1 - a0;
        let s = b1 - b0;
        let pq = b0 - a0;
        let rxs = cross(r, s);
        let pqxr = cross(pq, r);
        if rxs == 0.0 {
            if pqxr != 0.0 {
                return false;
            }
            // Collinear: any endpoint on the other segment.
            return on_segment(a0, a1, b0)
                || on_segment(a0, a1, b1)
                || on_segment(b0, b1, a0)
                || on_segment(b0, b1, a1);
        }
        let t = cross(pq, s) / rxs;
        let u = pqxr / rxs;
        (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
    }
}
