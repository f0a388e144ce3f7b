//! Closing-pass region painting
//!
//! After the removal pass, each cleanup location is painted over: an
//! opaque fill for commit mode, a translucent overlay for highlight
//! mode. Paint operations are appended to the page's content so they
//! draw above everything the page already shows.

use lopdf::{content::Operation, dictionary, Dictionary, Document, Object, ObjectId};

use crate::color::Color;
use crate::error::{Result, SweepError};
use crate::geometry::Point;
use crate::strategy::{CleanupLocation, Region};

/// Path-construction operations outlining a region as one subpath
pub fn region_path_ops(region: &Region) -> Vec<Operation> {
    polygon_path_ops(&region.polygon())
}

/// `m`/`l`/`h` subpath for an arbitrary polygon
pub fn polygon_path_ops(points: &[Point]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(points.len() + 1);
    for (i, p) in points.iter().enumerate() {
        let operator = if i == 0 { "m" } else { "l" };
        ops.push(Operation::new(
            operator,
            vec![Object::Real(p.x), Object::Real(p.y)],
        ));
    }
    ops.push(Operation::new("h", vec![]));
    ops
}

/// Opaque fill over one location, isolated in its own `q`/`Q` block
pub fn fill_ops(location: &CleanupLocation, default_fill: &Color) -> Vec<Operation> {
    let color = location.fill.as_ref().unwrap_or(default_fill);
    let mut ops = vec![Operation::new("q", vec![]), color.to_operation()];
    ops.extend(region_path_ops(&location.region));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Translucent overlay over one location using a constant-alpha graphics
/// state
pub fn overlay_ops(
    location: &CleanupLocation,
    default_fill: &Color,
    gs_name: &[u8],
) -> Vec<Operation> {
    let color = location.fill.as_ref().unwrap_or(default_fill);
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name.to_vec())]),
        color.to_operation(),
    ];
    ops.extend(region_path_ops(&location.region));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Register a constant-alpha `ExtGState` in the page's resources and
/// return the resource name the overlay operations reference.
///
/// Resources and `/ExtGState` may each be inline or indirect; shared
/// dictionaries are mutated in place, missing ones are created inline.
pub fn ensure_overlay_gstate(
    doc: &mut Document,
    page_id: ObjectId,
    alpha: f64,
) -> Result<Vec<u8>> {
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(alpha),
        "CA" => Object::Real(alpha),
    });
    let name = format!("GSsw{}", gs_id.0).into_bytes();

    // Discovery pass: locate the resource dictionary and any indirect
    // ExtGState target before taking mutable borrows
    let (resources_ref, states_ref) = {
        let page = doc.get_dictionary(page_id)?;
        let resources_ref = match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        let resources = match resources_ref {
            Some(id) => doc.get_dictionary(id).ok(),
            None => match page.get(b"Resources") {
                Ok(Object::Dictionary(d)) => Some(d),
                _ => None,
            },
        };
        let states_ref = resources.and_then(|r| match r.get(b"ExtGState") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        });
        (resources_ref, states_ref)
    };

    if let Some(sid) = states_ref {
        let states = doc.get_object_mut(sid)?.as_dict_mut()?;
        states.set(name.clone(), Object::Reference(gs_id));
        return Ok(name);
    }

    let resources: &mut Dictionary = match resources_ref {
        Some(rid) => doc.get_object_mut(rid)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if !matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
                page.set("Resources", Object::Dictionary(Dictionary::new()));
            }
            match page.get_mut(b"Resources") {
                Ok(Object::Dictionary(d)) => d,
                _ => {
                    return Err(SweepError::Content(
                        "page resources are not a dictionary".into(),
                    ))
                }
            }
        }
    };
    if !matches!(resources.get(b"ExtGState"), Ok(Object::Dictionary(_))) {
        resources.set("ExtGState", Object::Dictionary(Dictionary::new()));
    }
    if let Ok(Object::Dictionary(states)) = resources.get_mut(b"ExtGState") {
        states.set(name.clone(), Object::Reference(gs_id));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_fill_block_is_balanced_and_colored() {
        let location = CleanupLocation::new(1, Region::Rect(Rect::new(10.0, 20.0, 30.0, 40.0)))
            .with_fill(Color::green());
        let ops = fill_ops(&location, &Color::black());
        assert_eq!(ops.first().unwrap().operator, "q");
        assert_eq!(ops.last().unwrap().operator, "Q");
        assert!(ops.iter().any(|op| op.operator == "rg"));
        assert!(ops.iter().any(|op| op.operator == "f"));
    }

    #[test]
    fn test_default_fill_applies_when_location_has_none() {
        let location = CleanupLocation::new(1, Region::Rect(Rect::new(0.0, 0.0, 1.0, 1.0)));
        let ops = fill_ops(&location, &Color::black());
        // Device gray black
        assert!(ops.iter().any(|op| op.operator == "g"));
    }

    #[test]
    fn test_polygon_subpath_shape() {
        let ops = polygon_path_ops(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ]);
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["m", "l", "l", "h"]);
    }
}
