// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Well-known text for polygons
//!
//! Writing uses Rust's shortest round-trip float formatting, so a parsed
//! polygon has exactly the coordinates that were written.

use crate::error::{Error, Result};
use crate::polygon::Footprint;
use nalgebra::Point2;
use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while},
    character::complete::{char, multispace1},
    combinator::{all_consuming, map},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};
use std::fmt::Write;

/// Write a footprint as `POLYGON ((x y, ...), (...))`
pub fn footprint_to_wkt(fp: &Footprint) -> String {
    let rings: Vec<&[Point2<f64>]> = fp.rings().map(|r| r.points.as_slice()).collect();
    polygon_to_wkt(&rings)
}

/// Write rings (outer first) as a WKT polygon with explicitly closed rings
pub fn polygon_to_wkt(rings: &[&[Point2<f64>]]) -> String {
    let rings: Vec<&[Point2<f64>]> = rings.iter().copied().filter(|r| !r.is_empty()).collect();
    if rings.is_empty() {
        return "POLYGON EMPTY".to_string();
    }

    let mut out = String::from("POLYGON (");
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        for (j, p) in ring.iter().chain(ring.first()).enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            // Writing to a String cannot fail
            let _ = write!(out, "{} {}", p.x, p.y);
        }
        out.push(')');
    }
    out.push(')');
    out
}

/// Parse a WKT polygon into rings (outer first), without closing points
pub fn parse_polygon(input: &str) -> Result<Vec<Vec<Point2<f64>>>> {
    match all_consuming(polygon)(input) {
        Ok((_, rings)) => Ok(rings.into_iter().map(open_ring).collect()),
        Err(e) => Err(Error::Wkt(format!("failed to parse polygon: {}", e))),
    }
}

/// Drop the repeated closing point
fn open_ring(mut ring: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Skip whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

/// Coordinate pair: `x y`
fn coordinate(input: &str) -> IResult<&str, Point2<f64>> {
    map(separated_pair(double, multispace1, double), |(x, y)| {
        Point2::new(x, y)
    })(input)
}

/// Ring: `(x y, x y, ...)`
fn ring(input: &str) -> IResult<&str, Vec<Point2<f64>>> {
    delimited(
        char('('),
        separated_list1(delimited(ws, char(','), ws), delimited(ws, coordinate, ws)),
        char(')'),
    )(input)
}

/// Polygon: `POLYGON ((...), (...))` or `POLYGON EMPTY`
fn polygon(input: &str) -> IResult<&str, Vec<Vec<Point2<f64>>>> {
    delimited(
        ws,
        preceded(
            tag_no_case("POLYGON"),
            preceded(
                ws,
                alt((
                    map(tag_no_case("EMPTY"), |_| Vec::new()),
                    delimited(
                        char('('),
                        separated_list1(delimited(ws, char(','), ws), delimited(ws, ring, ws)),
                        char(')'),
                    ),
                )),
            ),
        ),
        ws,
    )(input)
}
