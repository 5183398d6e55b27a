#[macro_export]
macro_rules! unwrap_or {
    ($e: expr, $t: expr) => {
        match $e {
            Some(x) => x,
            None => $t,
        }
    };
}

#[macro_export]
macro_rules! unwrap_cont {
    ($e: expr) => {
        match $e {
            Some(x) => x,
            None => continue,
        }
    };
}

#[macro_export]
macro_rules! unwrap_orr {
    ($e: expr, $t: expr) => {
        match $e {
            Ok(x) => x,
            Err(_) => $t,
        }
    };
}

/// Like `unwrap_cont!` but for `Result`: the error is logged at warn level and pushed into
/// `$errs` (anything with a `push` method) before skipping.
#[macro_export]
macro_rules! unwrap_contwarn {
    ($e: expr, $errs: expr, $($t: expr),+) => {
        match $e {
            Ok(x) => x,
            Err(err) => {
                log::warn!("{}: {}", format_args!($($t),+), err);
                $errs.push(err);
                continue;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    fn first_even(v: &[u32]) -> Option<u32> {
        v.iter().copied().find(|x| x % 2 == 0)
    }

    fn sum_parsed(v: &[&str]) -> i32 {
        let mut total = 0;
        for s in v {
            let x: i32 = unwrap_orr!(s.parse(), continue);
            total += x;
        }
        total
    }

    fn sum_firsts(v: &[Vec<u32>]) -> u32 {
        let mut total = 0;
        for l in v {
            total += unwrap_cont!(l.first());
        }
        total
    }

    fn sum_valid(v: &[Result<u32, String>]) -> (u32, Vec<&String>) {
        let mut total = 0;
        let mut errors = vec![];
        for r in v {
            total += unwrap_contwarn!(r.as_ref(), errors, "skipping entry");
        }
        (total, errors)
    }

    #[test]
    fn unwrap_helpers() {
        assert_eq!(sum_parsed(&["1", "x", "2"]), 3);
        assert_eq!(unwrap_or!(first_even(&[1, 3]), 7), 7);
        assert_eq!(unwrap_or!(first_even(&[1, 4]), 7), 4);
        assert_eq!(sum_firsts(&[vec![1, 2], vec![], vec![5]]), 6);
        let v = [Ok(1), Err("bad".to_string()), Ok(2)];
        let (total, errors) = sum_valid(&v);
        assert_eq!(total, 3);
        assert_eq!(errors, vec!["bad"]);
    }
}
