use insurance_core::DerivedMetrics;

/// Hard ceiling on prompt size in characters. Oversized peer sets are
/// truncated rather than rejected.
pub const MAX_PROMPT_CHARS: usize = 6_000;

/// Fixed instruction sent with every request. Downstream consumers render
/// the reply verbatim, so the model must not emit markup.
pub const SYSTEM_INSTRUCTION: &str = "You are an analyst covering property and casualty insurers. \
Respond in plain, unformatted prose only: no markdown, no bullet points, no headers, no tables. \
Base every statement strictly on the figures provided.";

fn metric_lines(m: &DerivedMetrics) -> String {
    format!(
        "{} ({} {}): revenue ${:.0}M, net income ${:.0}M, combined ratio {:.1}% \
(loss {:.1}%, expense {:.1}%), underwriting margin {:.1}%, ROE {:.1}%, ROA {:.1}%, \
profit margin {:.1}%, investment yield {:.1}%, book value/share ${:.2}, \
float/share ${:.2}, reserve ratio {:.1}, debt/equity {:.1}%",
        m.symbol,
        m.period,
        m.year,
        m.revenue / 1_000_000.0,
        m.net_income / 1_000_000.0,
        m.combined_ratio,
        m.loss_ratio,
        m.expense_ratio,
        m.underwriting_profit_margin,
        m.roe,
        m.roa,
        m.profit_margin,
        m.investment_yield,
        m.book_value_per_share,
        m.float_per_share,
        m.reserve_ratio,
        m.debt_to_equity,
    )
}

/// Build the user prompt for one company, optionally with peer figures for
/// comparison. Peers are appended in order until the size ceiling is hit.
pub fn build_prompt(subject: &DerivedMetrics, peers: &[DerivedMetrics]) -> String {
    let mut prompt = format!(
        "Summarize the underwriting and financial condition of this P&C carrier:\n{}",
        metric_lines(subject)
    );

    // The header is written together with the first peer line that fits,
    // so an all-oversized peer set leaves no dangling header.
    const PEERS_HEADER: &str = "\n\nPeers for comparison:";
    let mut wrote_header = false;
    for peer in peers {
        let line = format!("\n{}", metric_lines(peer));
        let header_len = if wrote_header { 0 } else { PEERS_HEADER.len() };
        if prompt.len() + header_len + line.len() > MAX_PROMPT_CHARS {
            break;
        }
        if !wrote_header {
            prompt.push_str(PEERS_HEADER);
            wrote_header = true;
        }
        prompt.push_str(&line);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(symbol: &str) -> DerivedMetrics {
        DerivedMetrics {
            symbol: symbol.to_string(),
            year: 2023,
            period: "FY".to_string(),
            revenue: 41_364_000_000.0,
            net_income: 2_991_000_000.0,
            total_assets: 125_978_000_000.0,
            total_equity: 24_921_000_000.0,
            shares_outstanding: 232_000_000.0,
            profit_margin: 7.2,
            roe: 12.0,
            roa: 2.4,
            book_value_per_share: 107.42,
            tangible_book_value: 23_674_950_000.0,
            debt_to_equity: 32.1,
            expense_ratio: 30.3,
            loss_ratio: 65.2,
            combined_ratio: 95.5,
            underwriting_profit_margin: 4.5,
            investment_yield: 0.7,
            float_per_share: 380.11,
            reserve_ratio: 1.83,
        }
    }

    #[test]
    fn prompt_carries_the_headline_ratios() {
        let prompt = build_prompt(&sample("TRV"), &[]);
        assert!(prompt.contains("TRV (FY 2023)"));
        assert!(prompt.contains("combined ratio 95.5%"));
        assert!(prompt.contains("ROE 12.0%"));
        assert!(!prompt.contains("Peers for comparison"));
    }

    #[test]
    fn peers_are_listed_after_the_subject() {
        let prompt = build_prompt(&sample("TRV"), &[sample("PGR"), sample("ALL")]);
        let subject_pos = prompt.find("TRV (").expect("subject missing");
        let peer_pos = prompt.find("PGR (").expect("peer missing");
        assert!(subject_pos < peer_pos);
        assert!(prompt.contains("ALL ("));
    }

    #[test]
    fn header_is_omitted_when_no_peer_line_fits() {
        // A peer whose line alone blows the ceiling must not leave a
        // "Peers for comparison:" header with nothing under it.
        let giant = sample(&"X".repeat(MAX_PROMPT_CHARS));
        let prompt = build_prompt(&sample("TRV"), &[giant]);
        assert!(!prompt.contains("Peers for comparison"));
        assert!(prompt.contains("TRV (FY 2023)"));
    }

    #[test]
    fn oversized_peer_sets_are_truncated_not_rejected() {
        let peers: Vec<DerivedMetrics> = (0..200).map(|i| sample(&format!("P{:03}", i))).collect();
        let prompt = build_prompt(&sample("TRV"), &peers);
        assert!(prompt.len() <= MAX_PROMPT_CHARS);
        // The subject always survives truncation.
        assert!(prompt.contains("TRV (FY 2023)"));
    }
}
