//! Bundled example scripts.
//!
//! Presentation content: small programs demonstrating what the engine can
//! evaluate. The last expression of each script is its result.

const BASIC: &str = r#"// Variables, strings, and math - returns computed values
let x = 10;
const y = 20;
var z = x + y;

const str = "engine";
const info = {
    sum: z,
    string: str,
    length: str.length,
    uppercase: str.toUpperCase(),
    pi: Math.PI,
    sqrt16: Math.sqrt(16)
};

JSON.stringify(info, null, 2)"#;

const ES6: &str = r#"// ES6 features - returns results
const multiply = (a, b) => a * b;

const name = "engine";
const message = `Running ${name}`;

const [a, b, ...rest] = [1, 2, 3, 4, 5];
const spread = [...[1, 2, 3], 4, 5];

class Rectangle {
    constructor(width, height) {
        this.width = width;
        this.height = height;
    }

    get area() {
        return this.width * this.height;
    }
}

JSON.stringify({
    multiply_result: multiply(5, 3),
    template_literal: message,
    destructured: {a, b, rest},
    spread_result: spread,
    rectangle_area: new Rectangle(10, 5).area
}, null, 2)"#;

const ASYNC: &str = r#"// Promise resolution - note: no timers in the bare engine
async function asyncTest() {
    const result = await Promise.resolve("Hello async");
    const number = await Promise.resolve(42);

    return {
        message: result,
        answer: number,
        status: "Async test completed"
    };
}

asyncTest().then(r => JSON.stringify(r, null, 2))"#;

const BENCHMARK: &str = r#"// Tight-loop workloads - returns timing results
function fibonacci(n) {
    if (n <= 1) return n;
    return fibonacci(n - 1) + fibonacci(n - 2);
}

const start = Date.now();
const result = fibonacci(25);
const elapsed = Date.now() - start;

const arr = Array.from({length: 10000}, (_, i) => i);
const start2 = Date.now();
const sum = arr.reduce((acc, val) => acc + val, 0);
const elapsed2 = Date.now() - start2;

JSON.stringify({
    fibonacci: { n: 25, result: result, time_ms: elapsed },
    array_sum: { size: arr.length, sum: sum, time_ms: elapsed2 }
}, null, 2)"#;

const EXAMPLES: &[(&str, &str)] = &[
    ("basic", BASIC),
    ("es6", ES6),
    ("async", ASYNC),
    ("benchmark", BENCHMARK),
];

pub fn names() -> impl Iterator<Item = &'static str> {
    EXAMPLES.iter().map(|(name, _)| *name)
}

pub fn source(name: &str) -> Option<&'static str> {
    EXAMPLES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, source)| *source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_example_is_resolvable_by_name() {
        for name in names() {
            let body = source(name).expect("example source");
            assert!(!body.trim().is_empty());
        }
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        assert!(source("nope").is_none());
    }
}
