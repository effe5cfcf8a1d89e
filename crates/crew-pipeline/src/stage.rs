//! The fixed roster of analyst stages
//!
//! A stage's persona text frames the narrative backend and carries no logic.
//! Behaviour lives in the task template and the tool allow-list.

use crew_market::tool_names;
use serde::Serialize;
use std::fmt;

/// Stage identity, also the key of the stage's entry in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageId {
    Researcher,
    SentimentAnalyst,
    FinancialAnalyst,
    InvestmentStrategist,
}

impl StageId {
    /// All stages in execution order
    pub const ALL: [StageId; 4] = [
        Self::Researcher,
        Self::SentimentAnalyst,
        Self::FinancialAnalyst,
        Self::InvestmentStrategist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "Researcher",
            Self::SentimentAnalyst => "SentimentAnalyst",
            Self::FinancialAnalyst => "FinancialAnalyst",
            Self::InvestmentStrategist => "InvestmentStrategist",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the backend speaks as during a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl Persona {
    /// System prompt framing the backend as this persona
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a {role}. {backstory}\nYour goal: {goal}.",
            role = self.role,
            backstory = self.backstory,
            goal = self.goal,
        )
    }
}

/// Static definition of one pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    pub persona: Persona,
    /// Names of the only tools the backend is offered during this stage
    pub tools: &'static [&'static str],
    /// Task template; `{{ symbol }}` is the ticker under analysis
    pub instructions: &'static str,
    pub expected_output: &'static str,
}

const RESEARCHER: Stage = Stage {
    id: StageId::Researcher,
    persona: Persona {
        role: "Stock Market Researcher",
        goal: "Gather and analyze comprehensive data about the stock",
        backstory: "You're an experienced stock market researcher with a keen eye for detail \
                    and a talent for uncovering hidden trends.",
    },
    tools: &[
        tool_names::TECHNICAL,
        tool_names::FUNDAMENTAL,
        tool_names::COMPETITOR,
    ],
    instructions: "Conduct thorough research on {{ symbol }} including:
1. Technical analysis (trends, indicators, patterns)
2. Fundamental analysis (financial ratios, valuation metrics)
3. Competitive landscape analysis
Provide a detailed report with key findings.",
    expected_output: "A comprehensive research report with financial metrics, and competitor comparison.",
};

const SENTIMENT_ANALYST: Stage = Stage {
    id: StageId::SentimentAnalyst,
    persona: Persona {
        role: "Sentiment Analyst",
        goal: "Analyze market sentiment and its potential impact on the stock",
        backstory: "You're an expert in behavioral finance and sentiment analysis, capable of \
                    gauging market emotions and their effects on stock performance.",
    },
    tools: &[tool_names::SENTIMENT],
    instructions: "Analyze market sentiment for {{ symbol }} by:
1. Evaluating news sentiment
2. Analyzing news sentiments and digging up if some crucial breakthrough happened related to the company
3. Identifying potential sentiment-driven price movements",
    expected_output: "Sentiment analysis report with quantified sentiment scores and potential impact assessment.",
};

const FINANCIAL_ANALYST: Stage = Stage {
    id: StageId::FinancialAnalyst,
    persona: Persona {
        role: "Financial Analyst",
        goal: "Analyze the gathered data and provide investment insights",
        backstory: "You're a seasoned financial analyst known for your accurate predictions and \
                    ability to synthesize complex information.",
    },
    tools: &[
        tool_names::TECHNICAL,
        tool_names::FUNDAMENTAL,
        tool_names::RISK,
    ],
    instructions: "Synthesize all research data on {{ symbol }} to:
1. Evaluate risk-reward profile
2. Identify key strengths and weaknesses
3. Assess valuation attractiveness
4. Highlight potential catalysts",
    expected_output: "Detailed investment analysis with risk assessment and opportunity evaluation.",
};

const INVESTMENT_STRATEGIST: Stage = Stage {
    id: StageId::InvestmentStrategist,
    persona: Persona {
        role: "Investment Strategist",
        goal: "Develop a comprehensive investment strategy based on all available data",
        backstory: "You're a renowned investment strategist known for creating tailored \
                    investment plans that balance risk and reward.",
    },
    tools: &[],
    instructions: "Develop investment strategy for {{ symbol }} considering:
1. Different time horizons (short, medium, long-term)
2. Various risk profiles (conservative, moderate, aggressive)
3. Current market conditions
4. All previous analysis findings",
    expected_output: "Comprehensive investment strategy with clear recommendations for different investor types.",
};

/// The four stages in execution order
pub fn roster() -> [Stage; 4] {
    [RESEARCHER, SENTIMENT_ANALYST, FINANCIAL_ANALYST, INVESTMENT_STRATEGIST]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_follows_stage_order() {
        let ids: Vec<StageId> = roster().iter().map(|s| s.id).collect();
        assert_eq!(ids, StageId::ALL);
    }

    #[test]
    fn allow_lists() {
        let [researcher, sentiment, financial, strategist] = roster();
        assert_eq!(
            researcher.tools,
            ["technical_analysis", "fundamental_analysis", "competitor_analysis"]
        );
        assert_eq!(sentiment.tools, ["sentiment_analysis"]);
        assert_eq!(
            financial.tools,
            ["technical_analysis", "fundamental_analysis", "risk_assessment"]
        );
        assert!(strategist.tools.is_empty());
    }

    #[test]
    fn system_prompt_carries_persona() {
        let prompt = roster()[1].persona.system_prompt();
        assert!(prompt.starts_with("You are a Sentiment Analyst."));
        assert!(prompt.contains("behavioral finance"));
        assert!(prompt.contains("Your goal: Analyze market sentiment"));
    }
}
