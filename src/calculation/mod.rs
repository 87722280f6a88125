/// 估算 PEG、EPS、股息覆蓋率與合理價
pub mod valuation;
